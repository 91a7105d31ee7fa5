//! The LED strip seam.
//!
//! [`LedStrip`] is what the animation side writes to. [`SimulatedStrip`] keeps the
//! pixels in memory and records every rendered frame, which is what the binary drives
//! when no hardware driver is linked in. [`Light`] wraps one strip together with the
//! last color applied to the whole strip.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::trace;

use crate::color::Rgb;

/// Rendered frames a [`FrameLog`] keeps around
const FRAME_HISTORY: usize = 1024;

#[derive(Error, Debug)]
pub enum StripError {
    #[error("pixel {index} is out of range for a strip of {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("strip write failed: {reason}")]
    Write { reason: String },
}

/// An addressable RGB strip: pixels are staged with [`LedStrip::set_pixel`] and only
/// become visible on [`LedStrip::render`].
pub trait LedStrip: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Errors
    ///
    /// Fails with [`StripError::OutOfRange`] for an index past the end of the strip.
    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), StripError>;

    fn fill(&mut self, color: Rgb) -> Result<(), StripError> {
        for index in 0..self.len() {
            self.set_pixel(index, color)?;
        }
        Ok(())
    }

    /// Pushes the staged pixels out to the LEDs.
    ///
    /// # Errors
    ///
    /// Driver dependent, see [`StripError::Write`].
    fn render(&mut self) -> Result<(), StripError>;
}

/// Every frame a [`SimulatedStrip`] rendered, shared with whoever wants to look.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    inner: Arc<Mutex<FrameLogInner>>,
}

#[derive(Debug, Default)]
struct FrameLogInner {
    rendered: u64,
    recent: VecDeque<Vec<Rgb>>,
}

impl FrameLog {
    /// Total frames rendered so far, including the ones no longer kept.
    pub fn rendered(&self) -> u64 {
        lock(&self.inner).rendered
    }

    pub fn last(&self) -> Option<Vec<Rgb>> {
        lock(&self.inner).recent.back().cloned()
    }

    /// The kept frames numbered `first` and later, oldest first. Frame numbers start at
    /// zero, so `since(log.rendered())` taken now returns whatever is rendered from now on.
    pub fn since(&self, first: u64) -> Vec<Vec<Rgb>> {
        let inner = lock(&self.inner);
        let oldest_kept = inner.rendered - inner.recent.len() as u64;
        let skip = usize::try_from(first.saturating_sub(oldest_kept)).unwrap_or(usize::MAX);
        inner.recent.iter().skip(skip).cloned().collect()
    }

    fn push(&self, frame: Vec<Rgb>) {
        let mut inner = lock(&self.inner);
        if inner.recent.len() == FRAME_HISTORY {
            inner.recent.pop_front();
        }
        inner.recent.push_back(frame);
        inner.rendered += 1;
    }
}

/// A strip that only exists in memory.
#[derive(Debug)]
pub struct SimulatedStrip {
    pixels: Vec<Rgb>,
    frames: FrameLog,
}

impl SimulatedStrip {
    pub fn new(len: usize) -> Self {
        Self { pixels: vec![Rgb::BLACK; len], frames: FrameLog::default() }
    }

    /// A handle on the frames this strip renders, usable after the strip moved into a
    /// [`Light`].
    pub fn frames(&self) -> FrameLog {
        self.frames.clone()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}

impl LedStrip for SimulatedStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), StripError> {
        let len = self.pixels.len();
        let pixel = self.pixels.get_mut(index).ok_or(StripError::OutOfRange { index, len })?;
        *pixel = color;
        Ok(())
    }

    fn render(&mut self) -> Result<(), StripError> {
        trace!(first = ?self.pixels.first(), len = self.pixels.len(), "render frame");
        self.frames.push(self.pixels.clone());
        Ok(())
    }
}

/// The strip plus the color state: the last color applied to the whole strip.
///
/// Effects draw frames with [`Light::show`] and [`Light::show_pixels`], which leave the
/// color state alone. Only [`Light::set`] and [`Light::remember`] change it.
pub struct Light {
    inner: Mutex<LightInner>,
}

struct LightInner {
    strip: Box<dyn LedStrip>,
    color: Rgb,
}

impl Light {
    pub fn new(strip: impl LedStrip + 'static) -> Self {
        Self { inner: Mutex::new(LightInner { strip: Box::new(strip), color: Rgb::BLACK }) }
    }

    /// The last color applied to the whole strip.
    pub fn color(&self) -> Rgb {
        lock(&self.inner).color
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).strip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills the strip with `color`, renders it and records it as the color state.
    ///
    /// # Errors
    ///
    /// See [`LedStrip::render`]. The color state is left unchanged on failure.
    pub fn set(&self, color: Rgb) -> Result<(), StripError> {
        let mut inner = lock(&self.inner);
        inner.strip.fill(color)?;
        inner.strip.render()?;
        inner.color = color;
        Ok(())
    }

    /// Records `color` as the color state without touching the strip.
    pub fn remember(&self, color: Rgb) {
        lock(&self.inner).color = color;
    }

    /// Fills the strip with `color` and renders it.
    ///
    /// # Errors
    ///
    /// See [`LedStrip::render`].
    pub fn show(&self, color: Rgb) -> Result<(), StripError> {
        let mut inner = lock(&self.inner);
        inner.strip.fill(color)?;
        inner.strip.render()
    }

    /// Renders one frame, asking `pixel` for the color of each index.
    ///
    /// # Errors
    ///
    /// See [`LedStrip::render`].
    pub fn show_pixels(&self, mut pixel: impl FnMut(usize) -> Rgb) -> Result<(), StripError> {
        let mut inner = lock(&self.inner);
        for index in 0..inner.strip.len() {
            inner.strip.set_pixel(index, pixel(index))?;
        }
        inner.strip.render()
    }
}

impl std::fmt::Debug for Light {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Light").field("len", &inner.strip.len()).field("color", &inner.color).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
