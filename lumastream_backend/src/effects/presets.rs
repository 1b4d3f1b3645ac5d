//! Ready-made iterator effects.

use std::time::Duration;

use crate::{light_utils::color::RgbColor, registry::LightId};

use super::{ColorSource, EffectInterval, IteratorEffect, IteratorEffectMode, PatternStep};

#[derive(Debug, Clone)]
/// An iterator effect together with the lights it should run over, in order
pub struct EffectPlan {
	pub lights: Vec<LightId>,
	pub effect: IteratorEffect,
}

fn collect<L: Into<LightId>>(lights: impl IntoIterator<Item = L>) -> Vec<LightId> {
	return lights.into_iter().map(Into::into).collect();
}

/// A random color on every step
pub fn random_color<L: Into<LightId>>(
	lights: impl IntoIterator<Item = L>,
	mode: IteratorEffectMode,
	interval: impl Into<EffectInterval>,
) -> EffectPlan {
	return EffectPlan {
		lights: collect(lights),
		effect: IteratorEffect::new(mode, ColorSource::Random, interval).named("random color"),
	};
}

/// Turns lights on, then off on the next tick, with optional fades for both edges
pub fn flash<L: Into<LightId>>(
	lights: impl IntoIterator<Item = L>,
	color: RgbColor,
	mode: IteratorEffectMode,
	interval: impl Into<EffectInterval>,
	transition_on: Option<Duration>,
	transition_off: Option<Duration>,
) -> EffectPlan {
	return EffectPlan {
		lights: collect(lights),
		effect: IteratorEffect::new(mode, color, interval)
			.with_pattern(vec![
				PatternStep::on().with_transition(transition_on),
				PatternStep::off().with_transition(transition_off),
			])
			.named("flash"),
	};
}

/// A flash with hard edges
pub fn flash_quick<L: Into<LightId>>(
	lights: impl IntoIterator<Item = L>,
	color: RgbColor,
	mode: IteratorEffectMode,
	interval: impl Into<EffectInterval>,
) -> EffectPlan {
	let mut plan = flash(lights, color, mode, interval, None, None);
	plan.effect = plan.effect.named("flash quick");
	return plan;
}

/// A red light running back and forth over the lights, leaving a short fading trail.
///
/// Works best with six or more lights. The lights are walked in `Cycle` mode
/// over the sequence mirrored onto itself, so the ends are not lit twice.
pub fn knight_rider<L: Into<LightId>>(lights: impl IntoIterator<Item = L>) -> EffectPlan {
	let forward = collect(lights);
	let mut sequence = forward.clone();
	if forward.len() > 2 {
		sequence.extend(forward[1..forward.len() - 1].iter().rev());
	}
	return EffectPlan {
		lights: sequence,
		effect: IteratorEffect::new(
			IteratorEffectMode::Cycle,
			RgbColor::RED,
			Duration::from_millis(100),
		)
		.with_pattern(vec![
			PatternStep::on(),
			PatternStep::off().with_transition(Duration::from_millis(400)),
		])
		.named("knight rider"),
	};
}

/// Every light gets its own pick of red, green or white
pub fn christmas<L: Into<LightId>>(lights: impl IntoIterator<Item = L>) -> EffectPlan {
	return EffectPlan {
		lights: collect(lights),
		effect: IteratorEffect::new(
			IteratorEffectMode::AllIndividual,
			ColorSource::Palette(vec![RgbColor::RED, RgbColor::GREEN, RgbColor::WHITE]),
			Duration::from_millis(500),
		)
		.with_pattern(vec![PatternStep::on().with_transition(Duration::from_millis(400))])
		.named("christmas"),
	};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn knight_rider_mirrors_the_sequence() {
		let plan = knight_rider([1u16, 2, 3, 4]);
		let ids: Vec<u16> = plan.lights.iter().map(|light| light.0).collect();
		assert_eq!(ids, vec![1, 2, 3, 4, 3, 2]);
		assert_eq!(plan.effect.mode, IteratorEffectMode::Cycle);
		assert_eq!(plan.effect.color, ColorSource::Fixed(RgbColor::RED));
	}

	#[test]
	fn flash_alternates_on_and_off() {
		let plan = flash(
			[1u16],
			RgbColor::WHITE,
			IteratorEffectMode::All,
			Duration::from_millis(150),
			Some(Duration::from_secs(1)),
			None,
		);
		assert_eq!(plan.effect.pattern.len(), 2);
		assert_eq!(plan.effect.pattern[0].brightness, 1.0);
		assert_eq!(plan.effect.pattern[0].transition, Some(Duration::from_secs(1)));
		assert_eq!(plan.effect.pattern[1].brightness, 0.0);
	}
}
