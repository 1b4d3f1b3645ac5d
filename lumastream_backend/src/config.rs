//! Runtime configuration for streaming sessions.

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::{
	streaming::frame::ColorSpace,
	utilities::serialized_data::{self, LoadError},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
	/// Time between two frames of the AutoUpdate loop
	pub frame_interval_ms: u64,
	/// Time allowed for the transport handshake
	pub connect_timeout_ms: u64,
	/// Failed sends in a row after which the session is considered lost
	pub max_consecutive_failures: u32,
	pub color_space: ColorSpace,
	/// Recompute spatial effects before every frame
	pub auto_calculate_effects: bool,
}

impl Default for StreamingConfig {
	fn default() -> Self {
		return StreamingConfig {
			frame_interval_ms: 50,
			connect_timeout_ms: 5000,
			max_consecutive_failures: 40,
			color_space: ColorSpace::Rgb,
			auto_calculate_effects: true,
		};
	}
}

impl StreamingConfig {
	pub fn frame_interval(&self) -> Duration {
		return Duration::from_millis(self.frame_interval_ms);
	}

	pub fn connect_timeout(&self) -> Duration {
		return Duration::from_millis(self.connect_timeout_ms);
	}

	/// Loads a config from a `.json` or `.cbor` file. Missing fields take their defaults.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
		return serialized_data::load(path);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utilities::serialized_data::SerializedData;

	#[test]
	fn missing_fields_fall_back_to_defaults() {
		let config: StreamingConfig = SerializedData::JSON(serde_json::json!({
			"frame_interval_ms": 20,
			"color_space": "xy",
		}))
		.deserialize()
		.unwrap();
		assert_eq!(config.frame_interval(), Duration::from_millis(20));
		assert_eq!(config.color_space, ColorSpace::Xy);
		assert_eq!(config.max_consecutive_failures, 40);
		assert!(config.auto_calculate_effects);
	}

	#[test]
	fn loads_from_disk() {
		let path = std::env::temp_dir().join(format!("lumastream-config-{}.json", uuid::Uuid::new_v4()));
		std::fs::write(&path, r#"{ "connect_timeout_ms": 250 }"#).unwrap();
		let config = StreamingConfig::load(&path).unwrap();
		std::fs::remove_file(&path).ok();
		assert_eq!(config.connect_timeout(), Duration::from_millis(250));
		assert!(matches!(
			StreamingConfig::load(std::env::temp_dir().join("lumastream-missing.json")),
			Err(LoadError::Io(_))
		));
	}
}
