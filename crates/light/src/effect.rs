//! Long running animations.
//!
//! Each effect runs as its own task and draws frames until its cancellation token
//! fires. Cancellation is cooperative: the token is checked before every frame and
//! raced against every wait, so an effect that was asked to stop never renders again.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::color::Rgb;
use crate::mailbox::ColorMailbox;
use crate::strip::{Light, StripError};

const RAINBOW_FRAME: Duration = Duration::from_millis(20);
/// Degrees the wheel turns per rainbow frame
const RAINBOW_HUE_STEP: f32 = 1.0;

const FIRE_FRAME: Duration = Duration::from_millis(60);
const FIRE_BASE: Rgb = Rgb::new(217, 109, 0);
const FIRE_MAX_FLICKER: u8 = 50;

const BREATHE_FRAME: Duration = Duration::from_millis(20);
const BREATHE_PERIOD: Duration = Duration::from_secs(4);
/// Breathing never goes fully dark
const BREATHE_FLOOR: f32 = 0.05;

const SMOOTH_STEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// The hue wheel spread over the strip, rotating.
    Rainbow,
    /// Warm orange with random per pixel flicker.
    Fire,
    /// The current color pulsing in brightness. Follows color change events.
    Breathe,
    /// Idles until a color change event, then walks the strip there one step at a time.
    Smooth,
}

impl Effect {
    pub const ALL: [Self; 4] = [Self::Rainbow, Self::Fire, Self::Breathe, Self::Smooth];

    pub fn name(self) -> &'static str {
        match self {
            Self::Rainbow => "rainbow",
            Self::Fire => "fire",
            Self::Breathe => "breathe",
            Self::Smooth => "smooth",
        }
    }

    pub(crate) async fn run(self, context: EffectContext) {
        info!(effect = self.name(), "effect running");
        let result = match self {
            Self::Rainbow => rainbow(&context).await,
            Self::Fire => fire(&context).await,
            Self::Breathe => breathe(&context).await,
            Self::Smooth => smooth(&context).await,
        };

        match result {
            Ok(()) => debug!(effect = self.name(), "effect stopped"),
            Err(e) => error!(effect = self.name(), cause = %e, "effect failed"),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
#[error("unknown effect: {name:?}")]
pub struct UnknownEffect {
    name: String,
}

impl FromStr for Effect {
    type Err = UnknownEffect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|effect| effect.name() == s).ok_or_else(|| UnknownEffect { name: s.to_owned() })
    }
}

/// What a running effect gets to work with.
pub(crate) struct EffectContext {
    light: Arc<Light>,
    cancel: CancellationToken,
    colors: Arc<ColorMailbox>,
}

impl EffectContext {
    pub(crate) fn new(light: Arc<Light>, cancel: CancellationToken, colors: Arc<ColorMailbox>) -> Self {
        Self { light, cancel, colors }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleeps for `duration`. Returns `false` when cancelled instead.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }

    /// Waits for the next color change event. Returns `None` when cancelled instead.
    async fn next_color(&self) -> Option<Rgb> {
        tokio::select! {
            () = self.cancel.cancelled() => None,
            color = self.colors.recv() => Some(color),
        }
    }
}

#[allow(clippy::cast_precision_loss, reason = "strip lengths are tiny")]
async fn rainbow(context: &EffectContext) -> Result<(), StripError> {
    let spread = 360.0 / context.light.len().max(1) as f32;
    let mut offset = 0.0_f32;

    while !context.is_cancelled() {
        context.light.show_pixels(|index| Rgb::from_hue(offset + spread * index as f32))?;
        offset = (offset + RAINBOW_HUE_STEP) % 360.0;

        if !context.pause(RAINBOW_FRAME).await {
            break;
        }
    }
    Ok(())
}

async fn fire(context: &EffectContext) -> Result<(), StripError> {
    let mut rng = StdRng::from_entropy();

    while !context.is_cancelled() {
        context.light.show_pixels(|_| FIRE_BASE.dim_warm(rng.gen_range(0..=FIRE_MAX_FLICKER)))?;

        if !context.pause(FIRE_FRAME).await {
            break;
        }
    }
    Ok(())
}

async fn breathe(context: &EffectContext) -> Result<(), StripError> {
    let mut base = context.light.color();
    let phase_step = BREATHE_FRAME.as_secs_f32() / BREATHE_PERIOD.as_secs_f32();
    let mut phase = 0.0_f32;

    while !context.is_cancelled() {
        if let Some(color) = context.colors.take() {
            debug!(?color, "breathe follows new color");
            context.light.remember(color);
            base = color;
        }

        let level = BREATHE_FLOOR + (1.0 - BREATHE_FLOOR) * (1.0 - (TAU * phase).cos()) / 2.0;
        context.light.show(base.scale(level))?;

        if !context.pause(BREATHE_FRAME).await {
            break;
        }
        phase = (phase + phase_step) % 1.0;
    }
    Ok(())
}

async fn smooth(context: &EffectContext) -> Result<(), StripError> {
    'events: while let Some(mut target) = context.next_color().await {
        debug!(?target, "smooth transition");

        'walk: loop {
            for color in context.light.color().path_to(target) {
                if context.is_cancelled() {
                    break 'events;
                }
                context.light.set(color)?;

                if !context.pause(SMOOTH_STEP).await {
                    break 'events;
                }
                if let Some(retarget) = context.colors.take() {
                    debug!(from = ?target, to = ?retarget, "smooth transition retargeted");
                    target = retarget;
                    continue 'walk;
                }
            }
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for effect in Effect::ALL {
            assert_eq!(effect.name().parse::<Effect>().unwrap(), effect);
        }
        assert!("strobe".parse::<Effect>().is_err());
        assert!("Rainbow".parse::<Effect>().is_err());
    }

    #[test]
    fn serializes_as_lowercase_name() {
        assert_eq!(serde_json::to_string(&Effect::Breathe).unwrap(), r#""breathe""#);
    }
}
