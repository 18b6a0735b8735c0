//! Random rolls.
//!
//! Every roll in the combat core goes through [`Dice`], so a simulation can be
//! seeded for determinism and tests can script exact outcomes.

use std::collections::VecDeque;

/// Source of random rolls.
pub trait Dice {
    /// Uniform draw in `[0, 100)`.
    fn percent(&mut self) -> f32;

    /// Uniform integer in `[min, max]`. Returns `min` when `max <= min`.
    fn range_i32(&mut self, min: i32, max: i32) -> i32;

    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f32;
}

/// Seeded dice backed by `fastrand`.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: fastrand::Rng,
}

impl SeededDice {
    /// Create dice with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Dice for SeededDice {
    fn percent(&mut self) -> f32 {
        self.rng.f32() * 100.0
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            min
        } else {
            self.rng.i32(min..=max)
        }
    }

    fn unit(&mut self) -> f32 {
        self.rng.f32()
    }
}

/// Dice that replay scripted values, then fall back to fixed ones.
///
/// Range rolls fall back to the low end of the range.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    percents: VecDeque<f32>,
    ranges: VecDeque<i32>,
    units: VecDeque<f32>,
    fallback_percent: f32,
    fallback_unit: f32,
}

impl Default for ScriptedDice {
    fn default() -> Self {
        Self::constant(50.0)
    }
}

impl ScriptedDice {
    /// Dice whose percent draws always return `percent`.
    #[must_use]
    pub fn constant(percent: f32) -> Self {
        Self {
            percents: VecDeque::new(),
            ranges: VecDeque::new(),
            units: VecDeque::new(),
            fallback_percent: percent.clamp(0.0, 99.999),
            fallback_unit: 0.5,
        }
    }

    /// Queue percent draws.
    #[must_use]
    pub fn with_percents(mut self, values: &[f32]) -> Self {
        self.percents.extend(values.iter().copied());
        self
    }

    /// Queue range draws. Each value is clamped into the requested range.
    #[must_use]
    pub fn with_ranges(mut self, values: &[i32]) -> Self {
        self.ranges.extend(values.iter().copied());
        self
    }

    /// Queue unit draws.
    #[must_use]
    pub fn with_units(mut self, values: &[f32]) -> Self {
        self.units.extend(values.iter().copied());
        self
    }
}

impl Dice for ScriptedDice {
    fn percent(&mut self) -> f32 {
        self.percents.pop_front().unwrap_or(self.fallback_percent)
    }

    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.ranges
            .pop_front()
            .map_or(min, |value| value.clamp(min, max))
    }

    fn unit(&mut self) -> f32 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }
}
