//! Iterator effects step through an ordered list of lights according to a
//! mode, writing one pattern step per tick.

use rand::{
	rngs::StdRng,
	seq::{IndexedRandom, SliceRandom},
	Rng, SeedableRng,
};
use std::{sync::Arc, time::Duration};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
	light_utils::{color::RgbColor, state::LightState, store::LightStateStore},
	registry::LightId,
};

use super::{EffectInterval, EffectOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorEffectMode {
	/// Every light at once, with the same value
	All,
	/// Every light at once, each with its own value
	AllIndividual,
	/// One light per step, in order, wrapping around
	Cycle,
	/// One light per step, forward then backward, without repeating the ends
	Bounce,
	/// One randomly chosen light per step
	Random,
	/// One light per step, every light once per cycle in a freshly shuffled order
	RandomOrdered,
	/// One pass in order, then the effect completes
	Single,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorSource {
	Fixed(RgbColor),
	/// A new random color every time a light (or group of lights) is visited
	Random,
	/// A random pick from a palette
	Palette(Vec<RgbColor>),
}

impl ColorSource {
	fn draw(&self, rng: &mut StdRng) -> RgbColor {
		return match self {
			ColorSource::Fixed(color) => *color,
			ColorSource::Random => RgbColor::new(
				rng.random::<f64>(),
				rng.random::<f64>(),
				rng.random::<f64>(),
			),
			ColorSource::Palette(palette) => match palette.choose(rng) {
				Some(color) => *color,
				None => RgbColor::BLACK,
			},
		};
	}
}

impl From<RgbColor> for ColorSource {
	fn from(color: RgbColor) -> Self {
		return ColorSource::Fixed(color);
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// One tick's worth of output for the lights currently visited
pub struct PatternStep {
	pub brightness: f64,
	pub transition: Option<Duration>,
}

impl PatternStep {
	pub fn on() -> Self {
		return PatternStep {
			brightness: 1.0,
			transition: None,
		};
	}

	pub fn off() -> Self {
		return PatternStep {
			brightness: 0.0,
			transition: None,
		};
	}

	pub fn with_transition(mut self, transition: impl Into<Option<Duration>>) -> Self {
		self.transition = transition.into();
		return self;
	}
}

#[derive(Debug, Clone)]
/// Describes an iterator effect before it is started
pub struct IteratorEffect {
	pub name: String,
	pub mode: IteratorEffectMode,
	pub color: ColorSource,
	/// Written one step per tick for every visit. Defaults to a single "on" step.
	pub pattern: Vec<PatternStep>,
	pub interval: EffectInterval,
	/// Wall-clock limit, checked before every write
	pub duration: Option<Duration>,
	/// Number of full cycles before completing
	pub max_iterations: Option<u64>,
	pub seed: Option<u64>,
}

impl IteratorEffect {
	pub fn new(
		mode: IteratorEffectMode,
		color: impl Into<ColorSource>,
		interval: impl Into<EffectInterval>,
	) -> Self {
		return IteratorEffect {
			name: String::from("iterator"),
			mode,
			color: color.into(),
			pattern: vec![PatternStep::on()],
			interval: interval.into(),
			duration: None,
			max_iterations: None,
			seed: None,
		};
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		return self;
	}

	pub fn with_pattern(mut self, pattern: Vec<PatternStep>) -> Self {
		self.pattern = pattern;
		return self;
	}

	pub fn with_duration(mut self, duration: impl Into<Option<Duration>>) -> Self {
		self.duration = duration.into();
		return self;
	}

	pub fn with_max_iterations(mut self, iterations: u64) -> Self {
		self.max_iterations = Some(iterations);
		return self;
	}

	/// Makes random draws reproducible
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		return self;
	}

	/// The effect loop. Runs until cancelled, out of time, out of iterations,
	/// or (in `Single` mode) out of lights.
	pub(crate) async fn run(
		self,
		store: Arc<LightStateStore>,
		lights: Vec<LightId>,
		token: CancellationToken,
	) -> EffectOutcome {
		let started = Instant::now();
		let mut rng = match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};
		let pattern = if self.pattern.is_empty() {
			vec![PatternStep::on()]
		} else {
			self.pattern.clone()
		};
		let mut sequencer = Sequencer::new(self.mode, lights);
		let mut completed_cycles = 0u64;

		loop {
			let step = match sequencer.next(&mut rng) {
				Some(step) => step,
				None => return EffectOutcome::Completed,
			};

			// Colors are drawn once per visit so an on/off pattern keeps its color
			let colors: Vec<(LightId, RgbColor)> = if step.individual {
				step.lights
					.iter()
					.map(|light| (*light, self.color.draw(&mut rng)))
					.collect()
			} else {
				let color = self.color.draw(&mut rng);
				step.lights.iter().map(|light| (*light, color)).collect()
			};

			for pattern_step in pattern.iter() {
				if token.is_cancelled() {
					return EffectOutcome::Cancelled;
				}
				if let Some(duration) = self.duration {
					if started.elapsed() >= duration {
						return EffectOutcome::Completed;
					}
				}

				for (light, color) in colors.iter() {
					let state = LightState::new(*color, pattern_step.brightness)
						.with_transition(pattern_step.transition);
					if let Err(err) = store.set(*light, state) {
						warn!(effect = %self.name, error = %err, "dropped an effect write");
					}
				}

				tokio::select! {
					biased;
					_ = token.cancelled() => return EffectOutcome::Cancelled,
					_ = time::sleep(self.interval.get()) => {},
				}
			}

			if step.completes_cycle {
				completed_cycles += 1;
				if let Some(max_iterations) = self.max_iterations {
					if completed_cycles >= max_iterations {
						return EffectOutcome::Completed;
					}
				}
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
	pub lights: Vec<LightId>,
	pub individual: bool,
	pub completes_cycle: bool,
}

/// Decides which lights each step of an iterator effect visits
pub(crate) struct Sequencer {
	mode: IteratorEffectMode,
	lights: Vec<LightId>,
	/// Visiting order for the modes that walk one light at a time
	order: Vec<usize>,
	position: usize,
	visited: usize,
}

impl Sequencer {
	pub fn new(mode: IteratorEffectMode, lights: Vec<LightId>) -> Self {
		let count = lights.len();
		let order = match mode {
			IteratorEffectMode::Bounce if count > 2 => {
				// 0, 1, .., n-1, n-2, .., 1
				(0..count).chain((1..count - 1).rev()).collect()
			}
			_ => (0..count).collect(),
		};
		return Sequencer {
			mode,
			lights,
			order,
			position: 0,
			visited: 0,
		};
	}

	pub fn next(&mut self, rng: &mut StdRng) -> Option<Step> {
		if self.lights.is_empty() {
			return None;
		}
		return match self.mode {
			IteratorEffectMode::All | IteratorEffectMode::AllIndividual => Some(Step {
				lights: self.lights.clone(),
				individual: self.mode == IteratorEffectMode::AllIndividual,
				completes_cycle: true,
			}),
			IteratorEffectMode::Single => {
				if self.position >= self.order.len() {
					return None;
				}
				let step = self.single(self.order[self.position], false);
				self.position += 1;
				Some(Step {
					completes_cycle: self.position == self.order.len(),
					..step
				})
			}
			IteratorEffectMode::Cycle | IteratorEffectMode::Bounce => Some(self.walk()),
			IteratorEffectMode::RandomOrdered => {
				if self.position == 0 {
					self.order.shuffle(rng);
				}
				Some(self.walk())
			}
			IteratorEffectMode::Random => {
				let index = rng.random_range(0..self.lights.len());
				self.visited += 1;
				let completes_cycle = self.visited % self.lights.len() == 0;
				Some(self.single(index, completes_cycle))
			}
		};
	}

	fn walk(&mut self) -> Step {
		let index = self.order[self.position];
		self.position = (self.position + 1) % self.order.len();
		return self.single(index, self.position == 0);
	}

	fn single(&self, index: usize, completes_cycle: bool) -> Step {
		return Step {
			lights: vec![self.lights[index]],
			individual: false,
			completes_cycle,
		};
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lights(count: u16) -> Vec<LightId> {
		return (1..=count).map(LightId).collect();
	}

	fn visits(mode: IteratorEffectMode, count: u16, steps: usize) -> Vec<u16> {
		let mut rng = StdRng::seed_from_u64(7);
		let mut sequencer = Sequencer::new(mode, lights(count));
		return (0..steps)
			.filter_map(|_| sequencer.next(&mut rng))
			.map(|step| {
				assert_eq!(step.lights.len(), 1);
				step.lights[0].0
			})
			.collect();
	}

	#[test]
	fn cycle_visits_in_order_then_repeats() {
		assert_eq!(visits(IteratorEffectMode::Cycle, 3, 7), vec![1, 2, 3, 1, 2, 3, 1]);
	}

	#[test]
	fn bounce_does_not_repeat_the_ends() {
		assert_eq!(
			visits(IteratorEffectMode::Bounce, 3, 9),
			vec![1, 2, 3, 2, 1, 2, 3, 2, 1]
		);
		assert_eq!(visits(IteratorEffectMode::Bounce, 2, 4), vec![1, 2, 1, 2]);
	}

	#[test]
	fn single_stops_after_one_pass() {
		assert_eq!(visits(IteratorEffectMode::Single, 3, 10), vec![1, 2, 3]);
	}

	#[test]
	fn random_ordered_visits_everything_once_per_cycle() {
		let visited = visits(IteratorEffectMode::RandomOrdered, 5, 15);
		for cycle in visited.chunks(5) {
			let mut sorted = cycle.to_vec();
			sorted.sort();
			assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
		}
	}

	#[test]
	fn random_stays_inside_the_selection() {
		assert!(visits(IteratorEffectMode::Random, 4, 50)
			.iter()
			.all(|id| (1..=4).contains(id)));
	}

	#[test]
	fn all_modes_address_every_light_each_step() {
		let mut rng = StdRng::seed_from_u64(1);
		let mut all = Sequencer::new(IteratorEffectMode::All, lights(4));
		let step = all.next(&mut rng).unwrap();
		assert_eq!(step.lights, lights(4));
		assert!(!step.individual);
		assert!(step.completes_cycle);

		let mut individual = Sequencer::new(IteratorEffectMode::AllIndividual, lights(4));
		assert!(individual.next(&mut rng).unwrap().individual);
	}

	#[test]
	fn cycle_boundaries() {
		let mut rng = StdRng::seed_from_u64(1);
		let mut cycle = Sequencer::new(IteratorEffectMode::Cycle, lights(2));
		let boundaries: Vec<bool> = (0..4)
			.map(|_| cycle.next(&mut rng).unwrap().completes_cycle)
			.collect();
		assert_eq!(boundaries, vec![false, true, false, true]);
	}

	#[test]
	fn palette_only_draws_members() {
		let mut rng = StdRng::seed_from_u64(3);
		let palette = ColorSource::Palette(vec![RgbColor::RED, RgbColor::GREEN]);
		for _ in 0..20 {
			let color = palette.draw(&mut rng);
			assert!(color == RgbColor::RED || color == RgbColor::GREEN);
		}
		assert_eq!(ColorSource::Palette(vec![]).draw(&mut rng), RgbColor::BLACK);
	}
}
