use std::time::Duration;

use super::color::{clamp_unit, RgbColor};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// The target state of one light at one instant.
///
/// Written whole by effects and read whole by the frame encoder; the store
/// never merges two states field by field.
pub struct LightState {
	pub color: RgbColor,
	/// Brightness scalar in `[0, 1]`
	pub brightness: f64,
	/// How long the light should take to reach this state from whatever it was showing
	pub transition: Option<Duration>,
}

impl LightState {
	pub fn new(color: RgbColor, brightness: f64) -> Self {
		return LightState {
			color,
			brightness: clamp_unit(brightness),
			transition: None,
		};
	}

	/// A light that is fully off
	pub fn off() -> Self {
		return LightState::new(RgbColor::BLACK, 0.0);
	}

	pub fn with_transition(mut self, transition: impl Into<Option<Duration>>) -> Self {
		self.transition = transition.into().filter(|duration| !duration.is_zero());
		return self;
	}

	/// The color the light actually shows: the color scaled by brightness
	pub fn output(&self) -> RgbColor {
		return self.color.scaled(self.brightness);
	}
}
