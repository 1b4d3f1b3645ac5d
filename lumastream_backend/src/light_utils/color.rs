use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Clamps a channel value into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
	if value.is_nan() {
		return 0.0;
	}
	return value.clamp(0.0, 1.0);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Represents a color with red, green and blue components.
///
/// All channels are stored between 0.0 and 1.0. Anything outside of that
/// range is clamped on construction, so a color can never hold a value the
/// wire format would have to guess about.
///
/// ```rust
/// # use lumastream_lib::light_utils::color::RgbColor;
/// let red: RgbColor = "#FF0000".parse().unwrap();
/// assert_eq!(red, RgbColor::RED);
/// assert_eq!(red.to_hex(), "FF0000");
///
/// let clamped = RgbColor::new(1.5, -0.2, 0.5);
/// assert_eq!(clamped.r, 1.0);
/// assert_eq!(clamped.g, 0.0);
/// ```
pub struct RgbColor {
	pub r: f64,
	pub g: f64,
	pub b: f64,
}

impl RgbColor {
	pub const BLACK: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 0.0 };
	pub const WHITE: RgbColor = RgbColor { r: 1.0, g: 1.0, b: 1.0 };
	pub const RED: RgbColor = RgbColor { r: 1.0, g: 0.0, b: 0.0 };
	pub const GREEN: RgbColor = RgbColor { r: 0.0, g: 1.0, b: 0.0 };
	pub const BLUE: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 1.0 };

	pub fn new(red: f64, green: f64, blue: f64) -> Self {
		return RgbColor {
			r: clamp_unit(red),
			g: clamp_unit(green),
			b: clamp_unit(blue),
		};
	}

	/// Builds a color from 8-bit channel values
	pub fn from_u8(red: u8, green: u8, blue: u8) -> Self {
		return RgbColor {
			r: f64::from(red) / 255.0,
			g: f64::from(green) / 255.0,
			b: f64::from(blue) / 255.0,
		};
	}

	/// Parses a six-digit hex color. A leading `#` and surrounding whitespace are ignored.
	pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
		let cleaned = hex.trim().trim_start_matches('#');
		if cleaned.len() != 6 || !cleaned.is_ascii() {
			return Err(ColorError::InvalidHexLength(hex.to_owned()));
		}
		let channel = |range: std::ops::Range<usize>| {
			u8::from_str_radix(&cleaned[range], 16)
				.map_err(|_| ColorError::InvalidHexDigit(hex.to_owned()))
		};
		return Ok(RgbColor::from_u8(channel(0..2)?, channel(2..4)?, channel(4..6)?));
	}

	/// Returns the color as a six-digit hexadecimal string, in the form RRGGBB.
	pub fn to_hex(&self) -> String {
		let red = (self.r * 255.99) as u8;
		let green = (self.g * 255.99) as u8;
		let blue = (self.b * 255.99) as u8;
		return format!("{:02X}{:02X}{:02X}", red, green, blue);
	}

	/// Multiplies every channel by a brightness factor in `[0, 1]`
	pub fn scaled(&self, factor: f64) -> Self {
		let factor = clamp_unit(factor);
		return RgbColor::new(self.r * factor, self.g * factor, self.b * factor);
	}

	/// Linear interpolation towards `target`. `progress` is clamped to `[0, 1]`.
	pub fn lerp(&self, target: &RgbColor, progress: f64) -> Self {
		let progress = clamp_unit(progress);
		return RgbColor::new(
			self.r + (target.r - self.r) * progress,
			self.g + (target.g - self.g) * progress,
			self.b + (target.b - self.b) * progress,
		);
	}

	/// Converts to CIE 1931 xy chromaticity plus luminance.
	///
	/// This is the plain sRGB/D65 conversion. No gamut clamping is done; the
	/// controller maps out-of-gamut points itself.
	pub fn to_xy(&self) -> XyColor {
		let linear = |c: f64| {
			if c > 0.04045 {
				((c + 0.055) / 1.055).powf(2.4)
			} else {
				c / 12.92
			}
		};
		let (r, g, b) = (linear(self.r), linear(self.g), linear(self.b));
		let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
		let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
		let z = r * 0.0193 + g * 0.1192 + b * 0.9505;
		let sum = x + y + z;
		if sum <= f64::EPSILON {
			return XyColor { x: 0.0, y: 0.0, brightness: 0.0 };
		}
		return XyColor {
			x: clamp_unit(x / sum),
			y: clamp_unit(y / sum),
			brightness: clamp_unit(y),
		};
	}
}

impl Default for RgbColor {
	fn default() -> Self {
		return RgbColor::BLACK;
	}
}

impl FromStr for RgbColor {
	type Err = ColorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		return RgbColor::from_hex(s);
	}
}

impl fmt::Display for RgbColor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.to_hex())
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// CIE xy chromaticity with a brightness component, every field in `[0, 1]`
pub struct XyColor {
	pub x: f64,
	pub y: f64,
	pub brightness: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
	#[error("Hex color {0:?} should contain exactly 6 hex digits")]
	InvalidHexLength(String),
	#[error("Hex color {0:?} contains a non-hex digit")]
	InvalidHexDigit(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hex_with_and_without_prefix() {
		assert_eq!(RgbColor::from_hex("#FF0000").unwrap(), RgbColor::RED);
		assert_eq!(RgbColor::from_hex(" ffffff ").unwrap(), RgbColor::WHITE);
		assert_eq!(RgbColor::from_hex("00ff00").unwrap().to_hex(), "00FF00");
	}

	#[test]
	fn rejects_bad_hex() {
		assert!(matches!(RgbColor::from_hex("FFF"), Err(ColorError::InvalidHexLength(_))));
		assert!(matches!(RgbColor::from_hex("GG0000"), Err(ColorError::InvalidHexDigit(_))));
		assert!(matches!(RgbColor::from_hex(""), Err(ColorError::InvalidHexLength(_))));
	}

	#[test]
	fn hex_survives_a_parse() {
		for hex in ["12AB9F", "000000", "7F7F7F"] {
			assert_eq!(RgbColor::from_hex(hex).unwrap().to_hex(), hex);
		}
	}

	#[test]
	fn lerp_midpoint() {
		let mid = RgbColor::BLACK.lerp(&RgbColor::WHITE, 0.5);
		assert!((mid.r - 0.5).abs() < 1e-9);
		assert_eq!(RgbColor::BLACK.lerp(&RgbColor::WHITE, 4.0), RgbColor::WHITE);
	}

	#[test]
	fn nan_clamps_to_zero() {
		assert_eq!(RgbColor::new(f64::NAN, 0.0, 0.0).r, 0.0);
	}

	#[test]
	fn white_is_near_d65() {
		let xy = RgbColor::WHITE.to_xy();
		assert!((xy.x - 0.3127).abs() < 0.001);
		assert!((xy.y - 0.3290).abs() < 0.001);
		assert!((xy.brightness - 1.0).abs() < 0.001);
		assert_eq!(RgbColor::BLACK.to_xy().brightness, 0.0);
	}
}
