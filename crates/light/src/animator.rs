//! The animation task coordinator.
//!
//! At most one effect runs at a time. Starting an effect, setting a color directly and
//! the shutdown timer expiring all go through [`Animator`], which cancels the running
//! effect and waits for its task to finish before anything else touches the strip.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::color::Rgb;
use crate::effect::{Effect, EffectContext};
use crate::mailbox::ColorMailbox;
use crate::shutdown::ShutdownTimer;
use crate::strip::{Light, StripError};

/// Shared handle on the coordinator; clones drive the same light.
#[derive(Clone)]
pub struct Animator {
    inner: Arc<Inner>,
}

struct Inner {
    light: Arc<Light>,
    active: Mutex<Option<ActiveEffect>>,
    colors: Arc<ColorMailbox>,
    shutdown: ShutdownTimer,
}

struct ActiveEffect {
    effect: Effect,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActiveEffect {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(effect = self.effect.name(), cause = %e, "effect task did not finish cleanly");
        }
        info!(effect = self.effect.name(), "effect cancelled");
    }
}

impl Animator {
    pub fn new(light: Arc<Light>) -> Self {
        Self {
            inner: Arc::new(Inner {
                light,
                active: Mutex::new(None),
                colors: Arc::new(ColorMailbox::default()),
                shutdown: ShutdownTimer::new(),
            }),
        }
    }

    pub fn light(&self) -> &Arc<Light> {
        &self.inner.light
    }

    /// The color state: the last color applied to the whole strip.
    pub fn color(&self) -> Rgb {
        self.inner.light.color()
    }

    /// The effect currently running, if any.
    pub async fn active(&self) -> Option<Effect> {
        self.inner.active.lock().await.as_ref().map(|active| active.effect)
    }

    /// Stops the running effect, if any, then starts `effect`.
    ///
    /// The previous task has finished by the time the new one is spawned, so the two
    /// never draw on the strip together. Color events not yet consumed are dropped.
    pub async fn run_effect(&self, effect: Effect) {
        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            previous.stop().await;
        }
        self.inner.colors.take();

        let cancel = CancellationToken::new();
        let context = EffectContext::new(Arc::clone(&self.inner.light), cancel.clone(), Arc::clone(&self.inner.colors));
        let task = tokio::spawn(effect.run(context));
        info!(%effect, "effect started");

        *active = Some(ActiveEffect { effect, cancel, task });
    }

    /// Stops the running effect and waits for it. Returns the effect that was stopped.
    pub async fn cancel_effect(&self) -> Option<Effect> {
        let mut active = self.inner.active.lock().await;
        let previous = active.take()?;
        let effect = previous.effect;
        previous.stop().await;
        Some(effect)
    }

    /// Stops the running effect, then fills the strip with `color`.
    ///
    /// # Errors
    ///
    /// Fails when the strip can't be written, see [`Light::set`].
    pub async fn set_color(&self, color: Rgb) -> Result<(), StripError> {
        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            previous.stop().await;
        }
        self.inner.light.set(color)?;
        info!(?color, "color set");
        Ok(())
    }

    /// Hands `color` to the running effect. Effects that don't follow color events
    /// leave it alone.
    pub fn signal_color_change(&self, color: Rgb) {
        self.inner.colors.post(color);
    }

    /// Turns the light off in `seconds`. Zero or less disarms the timer.
    pub fn arm_shutdown(&self, seconds: i64) {
        let animator = self.clone();
        self.inner.shutdown.arm(seconds, move || async move { animator.turn_off().await });
    }

    /// Seconds before the light turns off, zero when the timer is not armed.
    pub fn shutdown_remaining(&self) -> u32 {
        self.inner.shutdown.remaining()
    }

    async fn turn_off(&self) {
        if let Err(e) = self.set_color(Rgb::BLACK).await {
            error!(cause = %e, "failed to turn the light off");
        }
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator").field("light", &self.inner.light).finish_non_exhaustive()
    }
}
