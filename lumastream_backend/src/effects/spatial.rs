//! Calculated effects whose output depends on where each light sits.
//!
//! Spatial effects have no timer of their own. They are recomputed once per
//! tick by whoever drives the group (normally the AutoUpdate loop, before it
//! takes its snapshot), and their parameters are moved around by the owner's
//! own code in between.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, Mutex, PoisonError, RwLock,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
	light_utils::{color::RgbColor, state::LightState, store::LightStateStore},
	registry::{Light, LightPosition, LightRegistry},
};

/// An effect computed from a light's position on every tick
pub trait SpatialEffect: Send + Sync + 'static {
	fn name(&self) -> &str;

	/// Inactive effects are skipped without writing anything
	fn is_active(&self) -> bool;

	/// The state `light` should take this tick, or `None` to leave it alone
	fn calculate(&self, light: &Light) -> Option<LightState>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PointParameters {
	position: LightPosition,
	radius: f64,
	color: RgbColor,
}

struct PointEffectInner {
	name: String,
	parameters: Mutex<PointParameters>,
	active: AtomicBool,
}

/// A colored point lighting up everything within `radius` of it.
///
/// Brightness falls off linearly from full at the point to zero at the
/// radius. The handle is cheap to clone; a placed clone sees every change
/// made through any other.
#[derive(Clone)]
pub struct PointEffect(Arc<PointEffectInner>);

impl PointEffect {
	/// Creates an inactive point at the origin
	pub fn new(color: RgbColor, radius: f64) -> Self {
		return PointEffect(Arc::new(PointEffectInner {
			name: String::from("point"),
			parameters: Mutex::new(PointParameters {
				position: LightPosition::default(),
				radius,
				color,
			}),
			active: AtomicBool::new(false),
		}));
	}

	pub fn set_position(&self, x: f64, y: f64, z: f64) {
		self.parameters().position = LightPosition::new(x, y, z);
	}

	pub fn move_by(&self, dx: f64, dy: f64, dz: f64) {
		let mut parameters = self.parameters();
		let current = parameters.position;
		parameters.position = LightPosition::new(current.x + dx, current.y + dy, current.z + dz);
	}

	pub fn position(&self) -> LightPosition {
		return self.parameters().position;
	}

	pub fn set_radius(&self, radius: f64) {
		self.parameters().radius = radius;
	}

	pub fn radius(&self) -> f64 {
		return self.parameters().radius;
	}

	pub fn set_color(&self, color: RgbColor) {
		self.parameters().color = color;
	}

	pub fn start(&self) {
		self.0.active.store(true, Ordering::Release);
	}

	pub fn stop(&self) {
		self.0.active.store(false, Ordering::Release);
	}

	fn parameters(&self) -> std::sync::MutexGuard<'_, PointParameters> {
		return self.0.parameters.lock().unwrap_or_else(PoisonError::into_inner);
	}
}

impl SpatialEffect for PointEffect {
	fn name(&self) -> &str {
		return &self.0.name;
	}

	fn is_active(&self) -> bool {
		return self.0.active.load(Ordering::Acquire);
	}

	fn calculate(&self, light: &Light) -> Option<LightState> {
		let parameters = *self.parameters();
		if parameters.radius.is_nan() || parameters.radius <= 0.0 {
			return None;
		}
		let distance = parameters.position.distance_to(&light.position);
		if distance >= parameters.radius {
			return None;
		}
		return Some(LightState::new(parameters.color, 1.0 - distance / parameters.radius));
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Identifies a placed spatial effect
pub struct SpatialEffectId(pub Uuid);

/// The spatial effects placed on a group, in placement order
#[derive(Default)]
pub struct SpatialLayer {
	effects: RwLock<Vec<(SpatialEffectId, Arc<dyn SpatialEffect>)>>,
}

impl SpatialLayer {
	pub fn new() -> Self {
		return SpatialLayer::default();
	}

	pub fn place<E: SpatialEffect>(&self, effect: E) -> SpatialEffectId {
		let id = SpatialEffectId(Uuid::new_v4());
		self.effects
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push((id, Arc::new(effect)));
		return id;
	}

	/// Returns `false` if the effect was not placed
	pub fn remove(&self, id: SpatialEffectId) -> bool {
		let mut effects = self.effects.write().unwrap_or_else(PoisonError::into_inner);
		let before = effects.len();
		effects.retain(|(placed, _)| *placed != id);
		return effects.len() != before;
	}

	pub fn len(&self) -> usize {
		return self.effects.read().unwrap_or_else(PoisonError::into_inner).len();
	}

	pub fn is_empty(&self) -> bool {
		return self.len() == 0;
	}

	/// Recomputes every active effect for every light and writes the results.
	///
	/// Effects are applied in placement order, so where two of them reach
	/// the same light the later one wins. Returns the number of writes.
	pub fn recalculate(&self, registry: &LightRegistry, store: &LightStateStore) -> usize {
		// Cloned out so effects placed or removed mid-pass do not wait on the lock
		let effects: Vec<Arc<dyn SpatialEffect>> = self
			.effects
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.map(|(_, effect)| Arc::clone(effect))
			.collect();

		let mut writes = 0;
		for effect in effects.iter().filter(|effect| effect.is_active()) {
			for light in registry.all() {
				if let Some(state) = effect.calculate(light) {
					match store.set(light.id, state) {
						Ok(()) => writes += 1,
						Err(err) => warn!(effect = effect.name(), error = %err, "dropped a spatial write"),
					}
				}
			}
		}
		return writes;
	}
}
