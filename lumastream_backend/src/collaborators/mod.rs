//! Seams to the systems the engine consumes but does not implement: bridge
//! discovery and the bridge's group configuration.

pub mod static_sources;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{net::IpAddr, time::Duration};
use thiserror::Error;

use crate::{impl_deserialize_err, registry::LightId};

pub use static_sources::{FileGroupSource, StaticBridgeLocator, StaticGroupSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedBridge {
	pub bridge_id: String,
	pub ip_address: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
	#[error("The search timeout must be longer than zero")]
	InvalidTimeout,
	#[error("Bridge search failed: {0}")]
	Other(String),
}

/// Finds bridges on the network
#[async_trait]
pub trait BridgeLocator: Send + Sync + 'static {
	/// Searches for at most `timeout`, which must be longer than zero
	async fn locate(&self, timeout: Duration) -> Result<Vec<LocatedBridge>, LocateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// One light of an entertainment area, as the bridge configuration reports it
pub struct LightDefinition {
	pub id: LightId,
	pub x: f64,
	pub y: f64,
	#[serde(default)]
	pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Membership and layout of an entertainment area
pub struct GroupDefinition {
	pub area_id: String,
	pub lights: Vec<LightDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupSourceError {
	#[error("Entertainment area {0:?} does not exist")]
	NotFound(String),
	#[error("Group definition could not be read:\n{0}")]
	InvalidData(String),
}
impl_deserialize_err!(GroupSourceError, Self::InvalidData);

/// Provides the layout of entertainment areas
#[async_trait]
pub trait GroupSource: Send + Sync + 'static {
	async fn load_group(&self, area_id: &str) -> Result<GroupDefinition, GroupSourceError>;
}
