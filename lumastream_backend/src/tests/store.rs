use std::sync::Arc;
use tokio::time;

use super::{millis, pair, row};
use crate::{
	light_utils::{color::RgbColor, state::LightState, store::StoreError},
	registry::LightId,
};

#[test]
fn snapshot_holds_the_last_write_per_light() {
	let group = row(3);
	let store = group.store();
	store.set(LightId(1), LightState::new(RgbColor::RED, 1.0)).unwrap();
	store.set(LightId(2), LightState::new(RgbColor::GREEN, 0.5)).unwrap();
	store.set(LightId(1), LightState::new(RgbColor::BLUE, 0.25)).unwrap();

	let snapshot = store.snapshot();
	let ids: Vec<LightId> = snapshot.entries().iter().map(|entry| entry.light).collect();
	assert_eq!(ids, vec![LightId(1), LightId(2), LightId(3)]);

	let first = snapshot.get(LightId(1)).unwrap();
	assert_eq!(first.state, LightState::new(RgbColor::BLUE, 0.25));
	assert_eq!(first.revision, 2);
	assert_eq!(snapshot.get(LightId(2)).unwrap().output, RgbColor::new(0.0, 0.5, 0.0));
	assert_eq!(snapshot.get(LightId(3)).unwrap().state, LightState::off());
	assert_eq!(snapshot.get(LightId(3)).unwrap().revision, 0);
}

#[test]
fn unknown_lights_are_rejected() {
	let group = pair();
	assert_eq!(
		group.store().set(LightId(7), LightState::off()),
		Err(StoreError::UnknownLight(LightId(7)))
	);
	assert_eq!(group.store().get(LightId(7)), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_on_different_lights_do_not_interfere() {
	let group = row(8);
	let mut writers = Vec::new();
	for id in 1..=8u16 {
		let store = Arc::clone(group.store());
		writers.push(tokio::spawn(async move {
			for step in 0..=100u32 {
				let brightness = step as f64 / 100.0;
				store.set(LightId(id), LightState::new(RgbColor::WHITE, brightness)).unwrap();
			}
		}));
	}
	for writer in writers {
		writer.await.unwrap();
	}

	let snapshot = group.snapshot();
	for entry in snapshot.entries() {
		assert_eq!(entry.state.brightness, 1.0);
		assert_eq!(entry.revision, 101);
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_writers_leave_one_whole_state() {
	let group = pair();
	let colors = [RgbColor::RED, RgbColor::GREEN];
	let mut writers = Vec::new();
	for color in colors {
		let store = Arc::clone(group.store());
		writers.push(tokio::spawn(async move {
			for _ in 0..500 {
				store.set(LightId(1), LightState::new(color, 1.0)).unwrap();
			}
		}));
	}
	let reader = {
		let store = Arc::clone(group.store());
		tokio::spawn(async move {
			for _ in 0..500 {
				let state = store.snapshot().get(LightId(1)).unwrap().state;
				// Never a mix of two writes
				assert!(state == LightState::off() || colors.contains(&state.color));
			}
		})
	};
	for writer in writers {
		writer.await.unwrap();
	}
	reader.await.unwrap();
	assert_eq!(group.store().revision(LightId(1)), Some(1000));
}

#[tokio::test]
async fn writes_are_published_in_order() {
	let group = pair();
	let mut writes = group.store().subscribe_writes();
	group.store().set(LightId(2), LightState::new(RgbColor::RED, 1.0)).unwrap();
	group.store().set(LightId(2), LightState::off()).unwrap();

	let first = writes.recv().await.unwrap();
	let second = writes.recv().await.unwrap();
	assert_eq!((first.light, first.revision), (LightId(2), 1));
	assert_eq!(first.state.color, RgbColor::RED);
	assert_eq!((second.light, second.revision), (LightId(2), 2));
}

#[tokio::test]
async fn dropped_subscribers_are_pruned_on_write() {
	let group = pair();
	let mut kept = group.store().subscribe_writes();
	let dropped = group.store().subscribe_writes();
	assert_eq!(group.store().subscriber_count(), 2);

	drop(dropped);
	group.store().set(LightId(1), LightState::off()).unwrap();
	assert_eq!(group.store().subscriber_count(), 1);
	assert_eq!(kept.recv().await.unwrap().light, LightId(1));
}

#[tokio::test(start_paused = true)]
async fn transitions_render_between_origin_and_target() {
	let group = pair();
	let store = group.store();
	store
		.set(LightId(1), LightState::new(RgbColor::WHITE, 1.0).with_transition(millis(1000)))
		.unwrap();

	let start = store.snapshot();
	assert_eq!(start.get(LightId(1)).unwrap().output, RgbColor::BLACK);
	assert_eq!(start.get(LightId(1)).unwrap().state.color, RgbColor::WHITE);

	time::advance(millis(500)).await;
	let halfway = store.snapshot().get(LightId(1)).unwrap().output;
	assert!((halfway.r - 0.5).abs() < 1e-9);
	assert!((halfway.g - 0.5).abs() < 1e-9);

	// A new write starts from whatever was showing
	store
		.set(LightId(1), LightState::off().with_transition(millis(1000)))
		.unwrap();
	assert!((store.snapshot().get(LightId(1)).unwrap().output.b - 0.5).abs() < 1e-9);

	time::advance(millis(1500)).await;
	assert_eq!(store.snapshot().get(LightId(1)).unwrap().output, RgbColor::BLACK);
}
