use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use crate::color::Rgb;

/// Single slot for color change events.
///
/// A newer color overwrites one that was not picked up yet, so a consumer only ever
/// sees the latest request.
#[derive(Debug, Default)]
pub struct ColorMailbox {
    slot: Mutex<Option<Rgb>>,
    notify: Notify,
}

impl ColorMailbox {
    pub fn post(&self, color: Rgb) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(color);
        self.notify.notify_one();
    }

    /// Takes the pending color, if any, without waiting.
    pub fn take(&self) -> Option<Rgb> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Waits for the next color.
    pub async fn recv(&self) -> Rgb {
        loop {
            if let Some(color) = self.take() {
                return color;
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn latest_color_wins() {
        let mailbox = ColorMailbox::default();
        mailbox.post(Rgb::new(1, 0, 0));
        mailbox.post(Rgb::new(2, 0, 0));

        assert_eq!(mailbox.take(), Some(Rgb::new(2, 0, 0)));
        assert_eq!(mailbox.take(), None);
    }

    #[tokio::test]
    async fn recv_returns_a_color_posted_earlier() {
        let mailbox = ColorMailbox::default();
        mailbox.post(Rgb::new(0, 3, 0));
        assert_eq!(mailbox.recv().await, Rgb::new(0, 3, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn recv_waits_for_a_post() {
        let mailbox = Arc::new(ColorMailbox::default());
        let receiver = tokio::spawn({
            let mailbox = Arc::clone(&mailbox);
            async move { mailbox.recv().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!receiver.is_finished());

        mailbox.post(Rgb::new(0, 0, 7));
        assert_eq!(receiver.await.unwrap(), Rgb::new(0, 0, 7));
    }

    #[tokio::test]
    async fn stale_wakeup_keeps_waiting() {
        let mailbox = ColorMailbox::default();
        mailbox.post(Rgb::new(1, 1, 1));
        assert!(mailbox.take().is_some());

        let waiting = tokio::time::timeout(Duration::from_millis(20), mailbox.recv()).await;
        assert!(waiting.is_err());
    }
}
