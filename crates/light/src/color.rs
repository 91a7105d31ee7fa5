use palette::{FromColor, Hsv, Srgb};
use serde::{Deserialize, Serialize};

/// A color as sent to the strip, one byte per channel.
///
/// The JSON form is `{"r": 0, "g": 0, "b": 0}`. Components outside `0..=255` or with
/// a fractional part do not deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fully saturated, full brightness color at `hue` degrees.
    pub fn from_hue(hue: f32) -> Self {
        let rgb: Srgb = Srgb::from_color(Hsv::new(hue.rem_euclid(360.0), 1.0, 1.0));
        let rgb: Srgb<u8> = rgb.into_format();
        Self::new(rgb.red, rgb.green, rgb.blue)
    }

    /// Scales every channel by `factor`, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self::new(channel(f32::from(self.r) * factor), channel(f32::from(self.g) * factor), channel(f32::from(self.b) * factor))
    }

    /// Subtracts `amount` from red and green, saturating at zero. Blue is left alone.
    #[must_use]
    pub fn dim_warm(self, amount: u8) -> Self {
        Self::new(self.r.saturating_sub(amount), self.g.saturating_sub(amount), self.b)
    }

    /// The colors met when walking in a straight line from `self` to `target`, one unit of
    /// euclidean distance per step.
    ///
    /// The last color yielded is exactly `target`. Nothing is yielded when both are equal.
    pub fn path_to(self, target: Self) -> impl Iterator<Item = Self> {
        let start = self.channels();
        let diff = [target.channels()[0] - start[0], target.channels()[1] - start[1], target.channels()[2] - start[2]];
        let length = diff.iter().map(|d| d * d).sum::<f32>().sqrt();
        let steps = step_count(length);

        (1..=steps).map(move |step| {
            if step == steps {
                return target;
            }
            #[allow(clippy::cast_precision_loss, reason = "at most 442 steps")]
            let travelled = step as f32 / length;
            Self::new(
                channel(start[0] + (diff[0] * travelled).round()),
                channel(start[1] + (diff[1] * travelled).round()),
                channel(start[2] + (diff[2] * travelled).round()),
            )
        })
    }

    fn channels(self) -> [f32; 3] {
        [f32::from(self.r), f32::from(self.g), f32::from(self.b)]
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "clamped to the u8 range")]
fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "a color distance is below 442")]
fn step_count(length: f32) -> u32 {
    length.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_rgb_field_names() {
        let color: Rgb = serde_json::from_str(r#"{"r":1,"g":2,"b":3}"#).unwrap();
        assert_eq!(color, Rgb::new(1, 2, 3));
        assert_eq!(serde_json::to_string(&color).unwrap(), r#"{"r":1,"g":2,"b":3}"#);
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        assert!(serde_json::from_str::<Rgb>(r#"{"r":256,"g":0,"b":0}"#).is_err());
        assert!(serde_json::from_str::<Rgb>(r#"{"r":-1,"g":0,"b":0}"#).is_err());
        assert!(serde_json::from_str::<Rgb>(r#"{"r":1.5,"g":0,"b":0}"#).is_err());
        assert!(serde_json::from_str::<Rgb>(r#"{"r":1,"g":0}"#).is_err());
    }

    #[test]
    fn primary_hues() {
        assert_eq!(Rgb::from_hue(0.0), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hue(120.0), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hue(240.0), Rgb::new(0, 0, 255));
        assert_eq!(Rgb::from_hue(360.0), Rgb::new(255, 0, 0));
    }

    #[test]
    fn scale_clamps_the_factor() {
        let color = Rgb::new(200, 100, 10);
        assert_eq!(color.scale(0.5), Rgb::new(100, 50, 5));
        assert_eq!(color.scale(2.0), color);
        assert_eq!(color.scale(-1.0), Rgb::BLACK);
    }

    #[test]
    fn dim_warm_saturates() {
        assert_eq!(Rgb::new(217, 109, 0).dim_warm(50), Rgb::new(167, 59, 0));
        assert_eq!(Rgb::new(20, 10, 7).dim_warm(50), Rgb::new(0, 0, 7));
    }

    #[test]
    fn path_walks_unit_steps_and_ends_on_target() {
        let path: Vec<Rgb> = Rgb::BLACK.path_to(Rgb::new(0, 0, 10)).collect();
        assert_eq!(path.len(), 10);
        assert_eq!(path[0], Rgb::new(0, 0, 1));
        assert_eq!(path[9], Rgb::new(0, 0, 10));

        let path: Vec<Rgb> = Rgb::new(10, 10, 10).path_to(Rgb::new(13, 14, 10)).collect();
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&Rgb::new(13, 14, 10)));
    }

    #[test]
    fn path_to_itself_is_empty() {
        assert_eq!(Rgb::new(5, 5, 5).path_to(Rgb::new(5, 5, 5)).count(), 0);
    }
}
