//! Arm-selection Strategies
//!
//! A [`Strategy`] is an immutable decision rule plus its hyperparameters. The
//! per-arm beliefs it acts on live in a separate [`StrategyState`] that the
//! engine owns and passes in explicitly, so one strategy value can drive many
//! independent trials at once.
//!
//! Shared rules every strategy follows:
//! - cold start: arms never pulled are pulled first, lowest index first
//! - ties between equal scores resolve to the lowest arm index
//! - the step number seen by `select` is 1-indexed and taken before the pull

mod epsilon;
mod greedy;
mod thompson;
mod ucb;

pub use epsilon::{EpsilonFirst, EpsilonGreedy, EpsilonSchedule};
pub use greedy::Greedy;
pub use thompson::Thompson;
pub use ucb::Ucb;

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use crate::distribution::PriorConfig;
use crate::distribution::{DistributionKind, Posterior, RunningStats};
use crate::error::{Result, SimulationError};
use crate::sanitize::sanitize_reward;
use crate::types::{DEFAULT_EPSILON, DEFAULT_EXPLORATION_STEPS, DEFAULT_UCB_CONFIDENCE};

// ==================== Strategy Trait ====================

pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Fresh per-arm state for a trial over arms of the given kinds.
    fn reset(&self, arms: &[DistributionKind]) -> StrategyState {
        StrategyState::new(arms, &PriorConfig::default())
    }

    /// Choose the arm to pull at `step` (1-indexed) from the state before the pull.
    fn select(&self, state: &StrategyState, step: u64, rng: &mut dyn RngCore) -> usize;

    /// Fold the reward observed on `arm` into the state.
    fn update(&self, state: &mut StrategyState, arm: usize, reward: f64) {
        state.observe(arm, reward);
    }

    /// This strategy's estimate of θ for `arm`, undefined before its first pull.
    fn estimate(&self, state: &StrategyState, arm: usize) -> Option<f64> {
        state.arm(arm).and_then(ArmEstimate::estimate)
    }

    fn estimates(&self, state: &StrategyState) -> Vec<Option<f64>> {
        (0..state.num_arms())
            .map(|arm| self.estimate(state, arm))
            .collect()
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn kind(&self) -> StrategyKind {
        (**self).kind()
    }

    fn reset(&self, arms: &[DistributionKind]) -> StrategyState {
        (**self).reset(arms)
    }

    fn select(&self, state: &StrategyState, step: u64, rng: &mut dyn RngCore) -> usize {
        (**self).select(state, step, rng)
    }

    fn update(&self, state: &mut StrategyState, arm: usize, reward: f64) {
        (**self).update(state, arm, reward)
    }

    fn estimate(&self, state: &StrategyState, arm: usize) -> Option<f64> {
        (**self).estimate(state, arm)
    }
}

// ==================== Strategy State ====================

/// One arm as seen by a strategy
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ArmEstimate {
    kind: DistributionKind,
    stats: RunningStats,
    posterior: Posterior,
}

impl ArmEstimate {
    pub fn new(kind: DistributionKind, prior: &PriorConfig) -> Self {
        Self {
            kind,
            stats: RunningStats::new(),
            posterior: prior.prior_for(kind),
        }
    }

    #[must_use]
    pub fn observe(self, reward: f64) -> Self {
        Self {
            kind: self.kind,
            stats: self.kind.update_estimate(self.stats, reward),
            posterior: self.posterior.update(sanitize_reward(self.kind, reward)),
        }
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    pub fn pulls(&self) -> u64 {
        self.stats.count()
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
    }

    /// Sample-mean estimate of θ
    pub fn estimate(&self) -> Option<f64> {
        self.kind.estimate(&self.stats)
    }
}

/// Per-arm beliefs of a strategy during one trial
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategyState {
    arms: Vec<ArmEstimate>,
    total_pulls: u64,
}

impl StrategyState {
    pub fn new(kinds: &[DistributionKind], prior: &PriorConfig) -> Self {
        Self {
            arms: kinds
                .iter()
                .map(|&kind| ArmEstimate::new(kind, prior))
                .collect(),
            total_pulls: 0,
        }
    }

    pub fn num_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn arms(&self) -> &[ArmEstimate] {
        &self.arms
    }

    pub fn arm(&self, index: usize) -> Option<&ArmEstimate> {
        self.arms.get(index)
    }

    pub fn kinds(&self) -> Vec<DistributionKind> {
        self.arms.iter().map(ArmEstimate::kind).collect()
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    pub fn pull_counts(&self) -> Vec<u64> {
        self.arms.iter().map(ArmEstimate::pulls).collect()
    }

    /// Lowest-index arm that has never been pulled
    pub fn first_unpulled(&self) -> Option<usize> {
        self.arms.iter().position(|arm| arm.pulls() == 0)
    }

    /// Arm with the highest sample-mean estimate; unpulled arms rank last.
    pub fn best_estimate_arm(&self) -> usize {
        argmax(
            self.arms
                .iter()
                .map(|arm| arm.estimate().unwrap_or(f64::NEG_INFINITY)),
        )
    }

    /// Fold one reward into `arm`. Out-of-range indices are ignored.
    pub fn observe(&mut self, arm: usize, reward: f64) {
        if let Some(slot) = self.arms.get_mut(arm) {
            *slot = slot.observe(reward);
            self.total_pulls += 1;
        }
    }
}

/// Index of the largest score; ties resolve to the lowest index, NaN ranks last.
pub(crate) fn argmax<I: IntoIterator<Item = f64>>(scores: I) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.into_iter().enumerate() {
        let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map_or(0, |(index, _)| index)
}

// ==================== Strategy Kind ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    EpsilonGreedy,
    EpsilonFirst,
    Ucb,
    Thompson,
    Greedy,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::EpsilonGreedy,
        StrategyKind::EpsilonFirst,
        StrategyKind::Ucb,
        StrategyKind::Thompson,
        StrategyKind::Greedy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::EpsilonGreedy => "epsilon_greedy",
            StrategyKind::EpsilonFirst => "epsilon_first",
            StrategyKind::Ucb => "ucb",
            StrategyKind::Thompson => "thompson",
            StrategyKind::Greedy => "greedy",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "epsilon_greedy" => Ok(StrategyKind::EpsilonGreedy),
            "epsilon_first" => Ok(StrategyKind::EpsilonFirst),
            "ucb" | "ucb1" => Ok(StrategyKind::Ucb),
            "thompson" | "thompson_sampling" => Ok(StrategyKind::Thompson),
            "greedy" => Ok(StrategyKind::Greedy),
            _ => Err(SimulationError::UnsupportedStrategy(s.to_string())),
        }
    }
}

// ==================== Strategy Configuration ====================

/// A strategy choice with its hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    EpsilonGreedy {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
        #[serde(default)]
        schedule: EpsilonSchedule,
    },
    EpsilonFirst {
        #[serde(default = "default_exploration_steps")]
        exploration_steps: u64,
    },
    Ucb {
        #[serde(default = "default_confidence")]
        confidence: f64,
    },
    Thompson {
        #[serde(default)]
        prior: PriorConfig,
    },
    Greedy,
}

impl StrategyConfig {
    /// Literature-standard hyperparameters for `kind`
    pub fn default_for(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::EpsilonGreedy => StrategyConfig::EpsilonGreedy {
                epsilon: DEFAULT_EPSILON,
                schedule: EpsilonSchedule::Constant,
            },
            StrategyKind::EpsilonFirst => StrategyConfig::EpsilonFirst {
                exploration_steps: DEFAULT_EXPLORATION_STEPS,
            },
            StrategyKind::Ucb => StrategyConfig::Ucb {
                confidence: DEFAULT_UCB_CONFIDENCE,
            },
            StrategyKind::Thompson => StrategyConfig::Thompson {
                prior: PriorConfig::default(),
            },
            StrategyKind::Greedy => StrategyConfig::Greedy,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyConfig::EpsilonGreedy { .. } => StrategyKind::EpsilonGreedy,
            StrategyConfig::EpsilonFirst { .. } => StrategyKind::EpsilonFirst,
            StrategyConfig::Ucb { .. } => StrategyKind::Ucb,
            StrategyConfig::Thompson { .. } => StrategyKind::Thompson,
            StrategyConfig::Greedy => StrategyKind::Greedy,
        }
    }

    /// Validate the hyperparameters and build the strategy.
    pub fn build(&self) -> Result<Box<dyn Strategy>> {
        Ok(match self {
            StrategyConfig::EpsilonGreedy { epsilon, schedule } => {
                Box::new(EpsilonGreedy::with_schedule(*epsilon, *schedule)?)
            }
            StrategyConfig::EpsilonFirst { exploration_steps } => {
                Box::new(EpsilonFirst::new(*exploration_steps))
            }
            StrategyConfig::Ucb { confidence } => Box::new(Ucb::new(*confidence)?),
            StrategyConfig::Thompson { prior } => Box::new(Thompson::with_prior(*prior)?),
            StrategyConfig::Greedy => Box::new(Greedy),
        })
    }
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_exploration_steps() -> u64 {
    DEFAULT_EXPLORATION_STEPS
}

fn default_confidence() -> f64 {
    DEFAULT_UCB_CONFIDENCE
}
