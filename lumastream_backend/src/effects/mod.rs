//! Effects: cancellable units of work that write light states into a
//! group's store.
//!
//! Every effect runs as its own task against a `CancellationToken` the
//! caller owns. Cancellation is observed at iteration boundaries only, so an
//! effect stops at most one interval after its token fires, and it never
//! writes again once it has seen the cancellation. Whatever it wrote last
//! stays in the store until another effect overwrites it.

pub mod iterator;
pub mod presets;
pub mod scheduler;
pub mod spatial;

use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::registry::LightId;

pub use iterator::{ColorSource, IteratorEffect, IteratorEffectMode, PatternStep};
pub use presets::EffectPlan;
pub use scheduler::{EffectInfo, EffectScheduler};
pub use spatial::{PointEffect, SpatialEffect, SpatialEffectId, SpatialLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectStatus {
	Created,
	Running,
	Cancelled,
	Completed,
}

impl EffectStatus {
	pub fn is_finished(&self) -> bool {
		return matches!(self, EffectStatus::Cancelled | EffectStatus::Completed);
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How an effect ended. Cancellation is a normal ending, not an error.
pub enum EffectOutcome {
	Completed,
	Cancelled,
}

impl From<EffectOutcome> for EffectStatus {
	fn from(outcome: EffectOutcome) -> Self {
		return match outcome {
			EffectOutcome::Completed => EffectStatus::Completed,
			EffectOutcome::Cancelled => EffectStatus::Cancelled,
		};
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
	#[error("Effect addresses light {0}, which is not part of the group")]
	InvalidAddressing(LightId),
	#[error("Effect does not address any lights")]
	EmptySelection,
}

/// Shortest wait an effect takes between iterations
pub const MIN_EFFECT_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
/// A wait time shared between an effect and its owner.
///
/// The owner may change it while the effect runs; the effect reads it again
/// before every wait. Values below `MIN_EFFECT_INTERVAL` are raised to it.
pub struct EffectInterval(Arc<AtomicU64>);

impl EffectInterval {
	pub fn new(interval: Duration) -> Self {
		return EffectInterval(Arc::new(AtomicU64::new(Self::to_nanos(interval))));
	}

	pub fn get(&self) -> Duration {
		return Duration::from_nanos(self.0.load(Ordering::Relaxed));
	}

	pub fn set(&self, interval: Duration) {
		self.0.store(Self::to_nanos(interval), Ordering::Relaxed);
	}

	/// Shortens the interval, stopping at `MIN_EFFECT_INTERVAL`
	pub fn decrease(&self, by: Duration) {
		self.set(self.get().saturating_sub(by));
	}

	fn to_nanos(interval: Duration) -> u64 {
		return u64::try_from(interval.max(MIN_EFFECT_INTERVAL).as_nanos()).unwrap_or(u64::MAX);
	}
}

impl From<Duration> for EffectInterval {
	fn from(interval: Duration) -> Self {
		return EffectInterval::new(interval);
	}
}

/// Handle to a running effect.
///
/// Dropping the handle does not stop the effect; the scheduler keeps
/// tracking it until its token is cancelled or it completes on its own.
#[must_use = "an effect keeps running until its token is cancelled"]
pub struct EffectHandle {
	id: Uuid,
	token: CancellationToken,
	status: watch::Receiver<EffectStatus>,
	task: JoinHandle<EffectOutcome>,
}

impl EffectHandle {
	pub(crate) fn new(
		id: Uuid,
		token: CancellationToken,
		status: watch::Receiver<EffectStatus>,
		task: JoinHandle<EffectOutcome>,
	) -> Self {
		return EffectHandle {
			id,
			token,
			status,
			task,
		};
	}

	pub fn id(&self) -> Uuid {
		return self.id;
	}

	pub fn status(&self) -> EffectStatus {
		return *self.status.borrow();
	}

	/// The token this effect watches. Cancelling it has the same effect as `cancel`.
	pub fn cancellation_token(&self) -> CancellationToken {
		return self.token.clone();
	}

	pub fn cancel(&self) {
		self.token.cancel();
	}

	pub fn is_finished(&self) -> bool {
		return self.task.is_finished();
	}

	/// Waits for the effect to end.
	pub async fn join(self) -> EffectOutcome {
		return match self.task.await {
			Ok(outcome) => outcome,
			// Panics inside an effect are bugs and should surface to the owner
			Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
			Err(_) => EffectOutcome::Cancelled,
		};
	}

	/// Cancels the effect and waits for it to stop
	pub async fn stop(self) -> EffectOutcome {
		self.cancel();
		return self.join().await;
	}
}
