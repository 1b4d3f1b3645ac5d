//! The light state store: one entry per registered light, written by any
//! number of effects and read once per tick by the frame encoder.
//!
//! Every entry has its own lock, so writers touching different lights never
//! wait on each other, and a snapshot only ever holds one entry's lock at a
//! time. Two writers racing on the same light resolve by whichever `set`
//! lands last. That race is how effects layer: nothing orders writers by
//! priority, only by wall-clock write order.

use rustc_hash::FxHashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};

use crate::registry::{LightId, LightRegistry};

use super::{color::RgbColor, state::LightState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
	#[error("Light {0} is not part of this group")]
	UnknownLight(LightId),
}

#[derive(Debug, Clone, Copy)]
struct StoreEntry {
	state: LightState,
	/// Output that was visible when `state` was written. Transitions start here.
	origin: RgbColor,
	written_at: Instant,
	revision: u64,
}

impl StoreEntry {
	/// Output of this entry at `now`, following the transition if one is running
	fn render(&self, now: Instant) -> RgbColor {
		let target = self.state.output();
		return match self.state.transition {
			Some(transition) if !transition.is_zero() => {
				let elapsed = now.saturating_duration_since(self.written_at);
				let progress = elapsed.as_secs_f64() / transition.as_secs_f64();
				self.origin.lerp(&target, progress)
			}
			_ => target,
		};
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// One completed write, as reported to write subscribers
pub struct StoreWrite {
	pub light: LightId,
	pub state: LightState,
	pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
	pub light: LightId,
	/// The last state written to this light
	pub state: LightState,
	/// What the light shows at the instant of the snapshot
	pub output: RgbColor,
	/// Number of writes this light has received so far
	pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
/// An immutable copy of the store at one instant, in registry order
pub struct Snapshot {
	pub taken_at: Instant,
	entries: Vec<SnapshotEntry>,
}

impl Snapshot {
	pub fn get(&self, light: LightId) -> Option<&SnapshotEntry> {
		return self.entries.iter().find(|entry| entry.light == light);
	}

	pub fn entries(&self) -> &[SnapshotEntry] {
		return &self.entries;
	}

	pub fn len(&self) -> usize {
		return self.entries.len();
	}

	pub fn is_empty(&self) -> bool {
		return self.entries.is_empty();
	}
}

pub struct LightStateStore {
	order: Vec<LightId>,
	entries: FxHashMap<LightId, Mutex<StoreEntry>>,
	subscribers: RwLock<Vec<mpsc::UnboundedSender<StoreWrite>>>,
}

impl LightStateStore {
	/// Creates one entry per registered light, every light starting off
	pub fn new(registry: &LightRegistry) -> Self {
		let now = Instant::now();
		let order = registry.ids();
		let entries = order
			.iter()
			.map(|id| {
				(
					*id,
					Mutex::new(StoreEntry {
						state: LightState::off(),
						origin: RgbColor::BLACK,
						written_at: now,
						revision: 0,
					}),
				)
			})
			.collect();
		return LightStateStore {
			order,
			entries,
			subscribers: RwLock::new(Vec::new()),
		};
	}

	/// Replaces the state of a light as a whole
	pub fn set(&self, light: LightId, state: LightState) -> Result<(), StoreError> {
		let entry = self.entries.get(&light).ok_or(StoreError::UnknownLight(light))?;
		let now = Instant::now();
		let revision = {
			let mut entry = entry.lock().unwrap_or_else(PoisonError::into_inner);
			let origin = entry.render(now);
			let revision = entry.revision + 1;
			*entry = StoreEntry {
				state,
				origin,
				written_at: now,
				revision,
			};
			revision
		};

		let write = StoreWrite { light, state, revision };
		let closed = {
			let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
			subscribers
				.iter()
				.filter(|subscriber| subscriber.send(write).is_err())
				.count()
		};
		if closed > 0 {
			self.subscribers
				.write()
				.unwrap_or_else(PoisonError::into_inner)
				.retain(|subscriber| !subscriber.is_closed());
		}
		return Ok(());
	}

	pub fn get(&self, light: LightId) -> Option<LightState> {
		let entry = self.entries.get(&light)?;
		return Some(entry.lock().unwrap_or_else(PoisonError::into_inner).state);
	}

	/// Number of writes a light has received
	pub fn revision(&self, light: LightId) -> Option<u64> {
		let entry = self.entries.get(&light)?;
		return Some(entry.lock().unwrap_or_else(PoisonError::into_inner).revision);
	}

	/// Copies every entry, locking one light at a time
	pub fn snapshot(&self) -> Snapshot {
		let taken_at = Instant::now();
		let entries = self
			.order
			.iter()
			.filter_map(|id| {
				let entry = *self.entries.get(id)?.lock().unwrap_or_else(PoisonError::into_inner);
				Some(SnapshotEntry {
					light: *id,
					state: entry.state,
					output: entry.render(taken_at),
					revision: entry.revision,
				})
			})
			.collect();
		return Snapshot { taken_at, entries };
	}

	/// Receives every completed write from now on. A dropped receiver is
	/// unsubscribed on the next write.
	pub fn subscribe_writes(&self) -> mpsc::UnboundedReceiver<StoreWrite> {
		let (sender, receiver) = mpsc::unbounded_channel();
		let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
		subscribers.retain(|subscriber| !subscriber.is_closed());
		subscribers.push(sender);
		return receiver;
	}

	#[cfg(test)]
	pub(crate) fn subscriber_count(&self) -> usize {
		return self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len();
	}
}
