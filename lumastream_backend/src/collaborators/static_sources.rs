use async_trait::async_trait;
use std::{path::PathBuf, time::Duration};

use crate::utilities::serialized_data::{LoadError, SerializedData};

use super::{
	BridgeLocator, GroupDefinition, GroupSource, GroupSourceError, LocateError, LocatedBridge,
};

/// Reports a fixed list of bridges, e.g. from the command line
#[derive(Debug, Clone, Default)]
pub struct StaticBridgeLocator {
	bridges: Vec<LocatedBridge>,
}

impl StaticBridgeLocator {
	pub fn new(bridges: Vec<LocatedBridge>) -> Self {
		return StaticBridgeLocator { bridges };
	}
}

#[async_trait]
impl BridgeLocator for StaticBridgeLocator {
	async fn locate(&self, timeout: Duration) -> Result<Vec<LocatedBridge>, LocateError> {
		if timeout.is_zero() {
			return Err(LocateError::InvalidTimeout);
		}
		return Ok(self.bridges.clone());
	}
}

/// Serves group definitions held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticGroupSource {
	groups: Vec<GroupDefinition>,
}

impl StaticGroupSource {
	pub fn new(groups: Vec<GroupDefinition>) -> Self {
		return StaticGroupSource { groups };
	}
}

#[async_trait]
impl GroupSource for StaticGroupSource {
	async fn load_group(&self, area_id: &str) -> Result<GroupDefinition, GroupSourceError> {
		return self
			.groups
			.iter()
			.find(|group| group.area_id == area_id)
			.cloned()
			.ok_or_else(|| GroupSourceError::NotFound(String::from(area_id)));
	}
}

/// Reads group definitions from a JSON or CBOR file holding a list of groups
#[derive(Debug, Clone)]
pub struct FileGroupSource {
	path: PathBuf,
}

impl FileGroupSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		return FileGroupSource { path: path.into() };
	}
}

#[async_trait]
impl GroupSource for FileGroupSource {
	async fn load_group(&self, area_id: &str) -> Result<GroupDefinition, GroupSourceError> {
		let data = SerializedData::from_path(&self.path).map_err(|err| match err {
			LoadError::Io(err) => GroupSourceError::InvalidData(err.to_string()),
			LoadError::Decode(err) => GroupSourceError::from(err),
		})?;
		let groups: Vec<GroupDefinition> = data.deserialize()?;
		return StaticGroupSource::new(groups).load_group(area_id).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{collaborators::LightDefinition, registry::LightId};

	fn living_room() -> GroupDefinition {
		return GroupDefinition {
			area_id: String::from("2"),
			lights: vec![
				LightDefinition { id: LightId(1), x: -1.0, y: 0.0, z: 0.0 },
				LightDefinition { id: LightId(2), x: 1.0, y: 0.0, z: 0.0 },
			],
		};
	}

	#[tokio::test]
	async fn locator_rejects_zero_timeout() {
		let locator = StaticBridgeLocator::default();
		assert_eq!(locator.locate(Duration::ZERO).await, Err(LocateError::InvalidTimeout));
		assert_eq!(locator.locate(Duration::from_secs(1)).await, Ok(vec![]));
	}

	#[tokio::test]
	async fn file_source_finds_areas_by_id() {
		let path = std::env::temp_dir().join(format!("lumastream-groups-{}.json", uuid::Uuid::new_v4()));
		std::fs::write(&path, serde_json::to_vec(&vec![living_room()]).unwrap()).unwrap();

		let source = FileGroupSource::new(&path);
		assert_eq!(source.load_group("2").await, Ok(living_room()));
		assert_eq!(
			source.load_group("9").await,
			Err(GroupSourceError::NotFound(String::from("9")))
		);
		std::fs::remove_file(&path).ok();
	}
}
