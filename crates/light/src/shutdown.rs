use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

/// Counts down whole seconds and runs an action when it reaches zero.
///
/// Arming again replaces the running countdown. Arming with zero or less disarms.
#[derive(Debug, Default)]
pub struct ShutdownTimer {
    countdown: Mutex<Option<Countdown>>,
}

#[derive(Debug)]
struct Countdown {
    remaining: Arc<AtomicU32>,
    cancel: CancellationToken,
}

impl ShutdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds left before the action runs, zero when disarmed.
    pub fn remaining(&self) -> u32 {
        self.countdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |countdown| countdown.remaining.load(Ordering::SeqCst))
    }

    /// Starts counting down from `seconds`, replacing any countdown in progress.
    ///
    /// `on_expire` runs once, on its own task, when the count reaches zero. It never runs
    /// for a countdown that was replaced or disarmed first.
    pub fn arm<F, Fut>(&self, seconds: i64, on_expire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut countdown = self.countdown.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = countdown.take() {
            previous.cancel.cancel();
        }

        if seconds <= 0 {
            info!("shutdown timer disarmed");
            return;
        }

        let seconds = u32::try_from(seconds).unwrap_or(u32::MAX);
        let remaining = Arc::new(AtomicU32::new(seconds));
        let cancel = CancellationToken::new();
        *countdown = Some(Countdown { remaining: Arc::clone(&remaining), cancel: cancel.clone() });
        info!(seconds, "shutdown timer armed");

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("shutdown countdown replaced");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                if cancel.is_cancelled() {
                    return;
                }
                if remaining.fetch_sub(1, Ordering::SeqCst) <= 1 {
                    break;
                }
            }

            info!("shutdown timer expired");
            on_expire().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() -> std::future::Ready<()> + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let on_expire = {
            let fired = Arc::clone(&fired);
            move || {
                fired.fetch_add(1, Ordering::SeqCst);
                std::future::ready(())
            }
        };
        (fired, on_expire)
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_fires_once() {
        let timer = ShutdownTimer::new();
        let (fired, on_expire) = counter();

        timer.arm(3, on_expire);
        assert_eq!(timer.remaining(), 3);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.remaining(), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(timer.remaining(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_or_negative_disarms() {
        let timer = ShutdownTimer::new();
        let (fired, on_expire) = counter();

        timer.arm(2, on_expire);
        timer.arm(0, || std::future::ready(()));
        assert_eq!(timer.remaining(), 0);

        timer.arm(-5, || std::future::ready(()));
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.remaining(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn arming_again_replaces_the_countdown() {
        let timer = ShutdownTimer::new();
        let (first, first_expire) = counter();
        let (second, second_expire) = counter();

        timer.arm(2, first_expire);
        sleep(Duration::from_millis(1500)).await;
        timer.arm(5, second_expire);

        sleep(Duration::from_millis(3200)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining(), 2);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
