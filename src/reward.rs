//! Reward resolution: one weighted draw per opened envelope.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;

/// Chance that a draw lands on a good reward.
pub const GOOD_PROBABILITY: f64 = 0.30;

pub const GOOD_ASSETS: &[&str] = &["rewards/good/gold-ingot.png"];
pub const BAD_ASSETS: &[&str] = &["rewards/bad/poop.png"];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RewardKind {
    Good,
    Bad,
}

impl RewardKind {
    pub fn is_good(self) -> bool {
        self == RewardKind::Good
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct RewardOutcome {
    pub kind: RewardKind,
    pub asset_ref: String,
}

/// Source of uniform values in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// Uniform index into a non-empty list of `len` items.
    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        let idx = (self.next_unit() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }
}

/// Real randomness, optionally seeded for reproducible sessions.
pub struct SeededSource(StdRng);

impl SeededSource {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_unit(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Replays fixed values in order, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Replays `values` in order, wrapping around at the end.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "scripted source needs at least one value");
        Self { values, cursor: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

/// Probability threshold plus the asset pool for each tier.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardTable {
    good_probability: f64,
    good_assets: Vec<String>,
    bad_assets: Vec<String>,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            good_probability: GOOD_PROBABILITY,
            good_assets: GOOD_ASSETS.iter().map(|s| s.to_string()).collect(),
            bad_assets: BAD_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RewardTable {
    pub fn new(
        good_probability: f64,
        good_assets: Vec<String>,
        bad_assets: Vec<String>,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&good_probability) {
            return Err(ConfigError::ProbabilityOutOfRange(good_probability));
        }
        if good_assets.is_empty() {
            return Err(ConfigError::EmptyAssets(RewardKind::Good));
        }
        if bad_assets.is_empty() {
            return Err(ConfigError::EmptyAssets(RewardKind::Bad));
        }
        Ok(Self {
            good_probability,
            good_assets,
            bad_assets,
        })
    }

    pub fn with_probability(good_probability: f64) -> Result<Self, ConfigError> {
        let base = Self::default();
        Self::new(good_probability, base.good_assets, base.bad_assets)
    }

    pub fn good_probability(&self) -> f64 {
        self.good_probability
    }

    pub fn assets(&self, kind: RewardKind) -> &[String] {
        match kind {
            RewardKind::Good => &self.good_assets,
            RewardKind::Bad => &self.bad_assets,
        }
    }

    /// One draw. The threshold is exclusive: `r == good_probability` is Bad.
    pub fn resolve(&self, rng: &mut impl RandomSource) -> RewardOutcome {
        let r = rng.next_unit();
        let kind = if r < self.good_probability {
            RewardKind::Good
        } else {
            RewardKind::Bad
        };
        let pool = self.assets(kind);
        let asset_ref = pool[rng.pick_index(pool.len())].clone();
        RewardOutcome { kind, asset_ref }
    }
}
