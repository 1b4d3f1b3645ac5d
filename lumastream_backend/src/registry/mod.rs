//! The light registry: every light in an entertainment group and where it
//! sits in the room. Built once, never mutated afterwards.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identity of a light as the controller knows it. This is the 16-bit id
/// placed in every per-light block of a frame.
pub struct LightId(pub u16);

impl fmt::Display for LightId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<u16> for LightId {
	fn from(id: u16) -> Self {
		return LightId(id);
	}
}

impl From<Light> for LightId {
	fn from(light: Light) -> Self {
		return light.id;
	}
}

impl From<&Light> for LightId {
	fn from(light: &Light) -> Self {
		return light.id;
	}
}

impl From<&LightId> for LightId {
	fn from(id: &LightId) -> Self {
		return *id;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
/// A point in the room. Every coordinate is in `[-1, 1]`.
pub struct LightPosition {
	pub x: f64,
	pub y: f64,
	#[serde(default)]
	pub z: f64,
}

impl LightPosition {
	pub fn new(x: f64, y: f64, z: f64) -> Self {
		return LightPosition { x, y, z };
	}

	pub fn distance_to(&self, other: &LightPosition) -> f64 {
		let dx = self.x - other.x;
		let dy = self.y - other.y;
		let dz = self.z - other.z;
		return (dx * dx + dy * dy + dz * dz).sqrt();
	}

	fn validate(&self, id: LightId) -> Result<(), RegistryError> {
		for coordinate in [self.x, self.y, self.z] {
			if !coordinate.is_finite() || !(-1.0..=1.0).contains(&coordinate) {
				return Err(RegistryError::PositionOutOfRange { id, position: *self });
			}
		}
		return Ok(());
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	Left,
	Center,
	Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
	pub id: LightId,
	pub position: LightPosition,
}

impl Light {
	/// Side of the room, from the sign of x
	pub fn side(&self) -> Side {
		if self.position.x < 0.0 {
			return Side::Left;
		} else if self.position.x > 0.0 {
			return Side::Right;
		} else {
			return Side::Center;
		}
	}
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
	#[error("Light {0} is registered more than once")]
	DuplicateLight(LightId),
	#[error("Light {id} has a position outside of [-1, 1]: {position:?}")]
	PositionOutOfRange { id: LightId, position: LightPosition },
}

/// Immutable catalog of the lights in a group, in registration order.
#[derive(Debug, Clone)]
pub struct LightRegistry {
	lights: Vec<Light>,
	index: FxHashMap<LightId, usize>,
}

impl LightRegistry {
	pub fn build<I, L>(lights: I) -> Result<Self, RegistryError>
	where
		I: IntoIterator<Item = (L, LightPosition)>,
		L: Into<LightId>,
	{
		let mut registry = LightRegistry {
			lights: Vec::new(),
			index: FxHashMap::default(),
		};
		for (id, position) in lights {
			let id = id.into();
			position.validate(id)?;
			if registry.index.contains_key(&id) {
				return Err(RegistryError::DuplicateLight(id));
			}
			registry.index.insert(id, registry.lights.len());
			registry.lights.push(Light { id, position });
		}
		return Ok(registry);
	}

	pub fn len(&self) -> usize {
		return self.lights.len();
	}

	pub fn is_empty(&self) -> bool {
		return self.lights.is_empty();
	}

	pub fn contains(&self, id: LightId) -> bool {
		return self.index.contains_key(&id);
	}

	pub fn get(&self, id: LightId) -> Option<&Light> {
		return self.index.get(&id).map(|index| &self.lights[*index]);
	}

	/// All lights, in registration order
	pub fn all(&self) -> &[Light] {
		return &self.lights;
	}

	pub fn ids(&self) -> Vec<LightId> {
		return self.lights.iter().map(|light| light.id).collect();
	}

	/// Lights with x < 0
	pub fn left(&self) -> Vec<Light> {
		return self.filter(|light| light.position.x < 0.0);
	}

	/// Lights with x >= 0. Center lights count as right.
	pub fn right(&self) -> Vec<Light> {
		return self.filter(|light| light.position.x >= 0.0);
	}

	/// Lights with y >= 0
	pub fn front(&self) -> Vec<Light> {
		return self.filter(|light| light.position.y >= 0.0);
	}

	/// Lights with y < 0
	pub fn back(&self) -> Vec<Light> {
		return self.filter(|light| light.position.y < 0.0);
	}

	/// Lights strictly closer than `radius` to `point`
	pub fn within(&self, point: &LightPosition, radius: f64) -> Vec<Light> {
		return self.filter(|light| light.position.distance_to(point) < radius);
	}

	pub fn filter(&self, predicate: impl Fn(&Light) -> bool) -> Vec<Light> {
		return self.lights.iter().filter(|light| predicate(light)).copied().collect();
	}

	/// All lights sorted with a caller-supplied ordering. The sort is stable.
	pub fn sorted_by(&self, compare: impl FnMut(&Light, &Light) -> Ordering) -> Vec<Light> {
		let mut lights = self.lights.clone();
		lights.sort_by(compare);
		return lights;
	}

	/// Walks the room as one continuous sweep: up the left side from front
	/// to back, then down the right side.
	///
	/// Left lights are ordered by descending y then ascending x, right lights
	/// by descending y then descending x, and the right side is reversed so
	/// the sweep ends next to where it started.
	pub fn sweep_order(&self) -> Vec<Light> {
		let mut left = self.left();
		left.sort_by(|a, b| {
			b.position
				.y
				.total_cmp(&a.position.y)
				.then(a.position.x.total_cmp(&b.position.x))
		});
		let mut right = self.right();
		right.sort_by(|a, b| {
			b.position
				.y
				.total_cmp(&a.position.y)
				.then(b.position.x.total_cmp(&a.position.x))
		});
		right.reverse();
		left.extend(right);
		return left;
	}
}
