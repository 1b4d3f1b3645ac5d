use std::{
	collections::HashMap,
	future::Future,
	sync::{Arc, Mutex, PoisonError},
};

use tokio::{
	sync::{watch, Notify},
	time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::registry::LightId;

use super::{EffectHandle, EffectOutcome, EffectStatus};

/// Keeps track of every effect running against a group.
///
/// Overlapping effects are allowed on purpose: a newer effect's writes simply
/// land on top of an older one's on the lights they share, and effects on
/// disjoint lights never notice each other. The scheduler holds no token and
/// so cannot stop anything; stopping is always done by whoever owns the
/// effect's `CancellationToken`.
#[derive(Clone, Default)]
pub struct EffectScheduler {
	/// Internal data is held in an arc so the effect tasks can deregister themselves.
	internal_data: Arc<SchedulerInternal>,
}

#[derive(Default)]
struct SchedulerInternal {
	effects: Mutex<HashMap<Uuid, TrackedEffect>>,
	/// Signalled every time an effect finishes
	settled: Notify,
}

struct TrackedEffect {
	name: String,
	lights: Vec<LightId>,
	started: Instant,
	status: watch::Receiver<EffectStatus>,
}

#[derive(Debug, Clone, PartialEq)]
/// Description of a running effect
pub struct EffectInfo {
	pub id: Uuid,
	pub name: String,
	pub lights: Vec<LightId>,
	pub status: EffectStatus,
	pub started: Instant,
}

impl EffectScheduler {
	pub fn new() -> Self {
		return EffectScheduler::default();
	}

	/// Spawns an effect body as its own task and starts tracking it.
	///
	/// Returns immediately. The effect deregisters itself when its body returns.
	pub fn spawn<F, Fut>(
		&self,
		name: impl Into<String>,
		lights: Vec<LightId>,
		token: CancellationToken,
		body: F,
	) -> EffectHandle
	where
		F: FnOnce(CancellationToken) -> Fut,
		Fut: Future<Output = EffectOutcome> + Send + 'static,
	{
		let id = Uuid::new_v4();
		let name = name.into();
		let (status_sender, status) = watch::channel(EffectStatus::Created);

		self.lock_effects().insert(
			id,
			TrackedEffect {
				name: name.clone(),
				lights,
				started: Instant::now(),
				status: status.clone(),
			},
		);

		let internal_data = Arc::clone(&self.internal_data);
		let future = body(token.clone());
		let task = tokio::spawn(async move {
			status_sender.send_replace(EffectStatus::Running);
			debug!(effect = %id, name = %name, "effect started");

			let outcome = future.await;

			status_sender.send_replace(outcome.into());
			debug!(effect = %id, name = %name, ?outcome, "effect finished");
			internal_data
				.effects
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.remove(&id);
			internal_data.settled.notify_waiters();
			return outcome;
		});

		return EffectHandle::new(id, token, status, task);
	}

	/// Every effect that has not finished yet
	pub fn active(&self) -> Vec<EffectInfo> {
		return self
			.lock_effects()
			.iter()
			.map(|(id, tracked)| Self::describe(id, tracked))
			.collect();
	}

	/// Running effects that address `light`. When more than one is listed,
	/// the light shows whichever of them wrote last.
	pub fn effects_on(&self, light: LightId) -> Vec<EffectInfo> {
		return self
			.lock_effects()
			.iter()
			.filter(|(_, tracked)| tracked.lights.contains(&light))
			.map(|(id, tracked)| Self::describe(id, tracked))
			.collect();
	}

	pub fn get(&self, id: &Uuid) -> Option<EffectInfo> {
		return self
			.lock_effects()
			.get(id)
			.map(|tracked| Self::describe(id, tracked));
	}

	pub fn len(&self) -> usize {
		return self.lock_effects().len();
	}

	pub fn is_idle(&self) -> bool {
		return self.lock_effects().is_empty();
	}

	/// Waits until every tracked effect has finished.
	///
	/// This does not cancel anything. Effects without a duration only finish
	/// once their owners cancel them.
	pub async fn wait_idle(&self) {
		loop {
			// Registered before the check so a finish in between is not missed
			let settled = self.internal_data.settled.notified();
			if self.is_idle() {
				return;
			}
			settled.await;
		}
	}

	fn describe(id: &Uuid, tracked: &TrackedEffect) -> EffectInfo {
		return EffectInfo {
			id: *id,
			name: tracked.name.clone(),
			lights: tracked.lights.clone(),
			status: *tracked.status.borrow(),
			started: tracked.started,
		};
	}

	fn lock_effects(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, TrackedEffect>> {
		return self
			.internal_data
			.effects
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
	}
}
