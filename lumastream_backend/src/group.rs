//! An entertainment group: the registry, the state store written by every
//! effect, the effects running against it, and the placed spatial effects.
//!
//! A group lives independently of any connection, so effects can be
//! composed before a session exists and keep running across reconnects.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
	collaborators::GroupDefinition,
	effects::{
		EffectError, EffectHandle, EffectPlan, EffectScheduler, IteratorEffect, SpatialEffect,
		SpatialEffectId, SpatialLayer,
	},
	light_utils::{state::LightState, store::{LightStateStore, Snapshot}},
	registry::{LightId, LightPosition, LightRegistry, RegistryError},
};

struct GroupInner {
	registry: LightRegistry,
	store: Arc<LightStateStore>,
	scheduler: EffectScheduler,
	spatial: SpatialLayer,
}

#[derive(Clone)]
pub struct Group(Arc<GroupInner>);

impl Group {
	/// Builds a group from `(id, position)` pairs. Every light starts off.
	pub fn build<I, L>(lights: I) -> Result<Self, RegistryError>
	where
		I: IntoIterator<Item = (L, LightPosition)>,
		L: Into<LightId>,
	{
		let registry = LightRegistry::build(lights)?;
		let store = Arc::new(LightStateStore::new(&registry));
		return Ok(Group(Arc::new(GroupInner {
			registry,
			store,
			scheduler: EffectScheduler::new(),
			spatial: SpatialLayer::new(),
		})));
	}

	pub fn from_definition(definition: &GroupDefinition) -> Result<Self, RegistryError> {
		return Group::build(
			definition
				.lights
				.iter()
				.map(|light| (light.id, LightPosition::new(light.x, light.y, light.z))),
		);
	}

	pub fn registry(&self) -> &LightRegistry {
		return &self.0.registry;
	}

	pub fn store(&self) -> &Arc<LightStateStore> {
		return &self.0.store;
	}

	pub fn effects(&self) -> &EffectScheduler {
		return &self.0.scheduler;
	}

	pub fn snapshot(&self) -> Snapshot {
		return self.0.store.snapshot();
	}

	/// Writes the same state to every listed light, checking all of them first
	pub fn set_state<L: Into<LightId>>(
		&self,
		lights: impl IntoIterator<Item = L>,
		state: LightState,
	) -> Result<(), EffectError> {
		let lights = self.resolve(lights)?;
		for light in lights {
			// Resolved above, so the store knows every one of these
			self.0.store.set(light, state).ok();
		}
		return Ok(());
	}

	/// Starts an iterator effect over `lights`, in the given order.
	///
	/// Returns as soon as the effect is spawned. Every light is checked
	/// against the registry first; if any is unknown the effect never starts.
	pub fn run_iterator_effect<L: Into<LightId>>(
		&self,
		lights: impl IntoIterator<Item = L>,
		effect: IteratorEffect,
		token: CancellationToken,
	) -> Result<EffectHandle, EffectError> {
		let lights = self.resolve(lights)?;
		let store = Arc::clone(&self.0.store);
		let name = effect.name.clone();
		let effect_lights = lights.clone();
		return Ok(self.0.scheduler.spawn(name, lights, token, move |token| {
			effect.run(store, effect_lights, token)
		}));
	}

	pub fn run(&self, plan: EffectPlan, token: CancellationToken) -> Result<EffectHandle, EffectError> {
		return self.run_iterator_effect(plan.lights, plan.effect, token);
	}

	/// Places a spatial effect. It is recomputed on every `recalculate_effects`.
	pub fn place_effect<E: SpatialEffect>(&self, effect: E) -> SpatialEffectId {
		return self.0.spatial.place(effect);
	}

	/// Removes a placed spatial effect. Lights keep whatever it wrote last.
	pub fn remove_effect(&self, id: SpatialEffectId) -> bool {
		return self.0.spatial.remove(id);
	}

	pub fn spatial_effects(&self) -> &SpatialLayer {
		return &self.0.spatial;
	}

	/// Runs every placed spatial effect once. Returns the number of writes.
	pub fn recalculate_effects(&self) -> usize {
		return self.0.spatial.recalculate(&self.0.registry, &self.0.store);
	}

	fn resolve<L: Into<LightId>>(&self, lights: impl IntoIterator<Item = L>) -> Result<Vec<LightId>, EffectError> {
		let lights: Vec<LightId> = lights.into_iter().map(Into::into).collect();
		if lights.is_empty() {
			return Err(EffectError::EmptySelection);
		}
		if let Some(unknown) = lights.iter().find(|light| !self.0.registry.contains(**light)) {
			return Err(EffectError::InvalidAddressing(*unknown));
		}
		return Ok(lights);
	}
}
