//! Control plane of an addressable LED lamp.
//!
//! An [`App`] owns one LED strip behind a [`Light`], an [`Animator`] that runs at most
//! one [`Effect`] on it at a time, a shutdown timer, and the HTTP API served through
//! `wifirgb-web`.
//!
//! ```no_run
//! use clap::Parser;
//! use wifirgb_light::{App, Config, SimulatedStrip};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), wifirgb_light::AppError> {
//!     let config = Config::parse();
//!     let app = App::new(&config, SimulatedStrip::new(config.leds))?;
//!     app.run().await
//! }
//! ```

mod animator;
mod app;
mod color;
mod config;
mod effect;
mod mailbox;
mod shutdown;
mod strip;

pub mod api;

pub use animator::Animator;
pub use app::{App, AppError};
pub use color::Rgb;
pub use config::Config;
pub use effect::{Effect, UnknownEffect};
pub use shutdown::ShutdownTimer;
pub use strip::{FrameLog, LedStrip, Light, SimulatedStrip, StripError};
