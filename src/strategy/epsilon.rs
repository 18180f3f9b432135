//! Semi-uniform strategies
//!
//! - Epsilon-greedy: explore a uniformly random arm with probability ε,
//!   otherwise exploit the best current estimate. ε may decay with the step.
//! - Epsilon-first: a pure exploration phase of `exploration_steps` steps
//!   after the cold start, then pure exploitation.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{Strategy, StrategyKind, StrategyState};
use crate::error::{Result, SimulationError};

// ==================== Decay Schedule ====================

/// How ε evolves with the (1-indexed) step number
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    #[default]
    Constant,
    /// ε / (1 + rate * (t - 1))
    Inverse { rate: f64 },
    /// ε * exp(-rate * (t - 1))
    Exponential { rate: f64 },
}

impl EpsilonSchedule {
    pub fn validate(&self) -> Result<()> {
        match *self {
            EpsilonSchedule::Constant => Ok(()),
            EpsilonSchedule::Inverse { rate } | EpsilonSchedule::Exponential { rate } => {
                if rate.is_finite() && rate >= 0.0 {
                    Ok(())
                } else {
                    Err(SimulationError::InvalidConfiguration(format!(
                        "epsilon decay rate must be finite and >= 0, got {rate}"
                    )))
                }
            }
        }
    }

    /// Effective ε at `step`; step 1 always yields `base`.
    pub fn epsilon_at(&self, base: f64, step: u64) -> f64 {
        let elapsed = step.saturating_sub(1) as f64;
        let epsilon = match *self {
            EpsilonSchedule::Constant => base,
            EpsilonSchedule::Inverse { rate } => base / (1.0 + rate * elapsed),
            EpsilonSchedule::Exponential { rate } => base * (-rate * elapsed).exp(),
        };
        epsilon.clamp(0.0, 1.0)
    }
}

// ==================== Epsilon-Greedy ====================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
    schedule: EpsilonSchedule,
}

impl EpsilonGreedy {
    /// Constant-ε strategy; ε must lie in [0, 1].
    pub fn new(epsilon: f64) -> Result<Self> {
        Self::with_schedule(epsilon, EpsilonSchedule::Constant)
    }

    pub fn with_schedule(epsilon: f64, schedule: EpsilonSchedule) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "epsilon must lie in [0, 1], got {epsilon}"
            )));
        }
        schedule.validate()?;
        Ok(Self { epsilon, schedule })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn schedule(&self) -> EpsilonSchedule {
        self.schedule
    }
}

impl Strategy for EpsilonGreedy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EpsilonGreedy
    }

    fn select(&self, state: &StrategyState, step: u64, rng: &mut dyn RngCore) -> usize {
        if let Some(arm) = state.first_unpulled() {
            return arm;
        }

        let epsilon = self.schedule.epsilon_at(self.epsilon, step);
        if epsilon > 0.0 && rng.gen::<f64>() < epsilon {
            return rng.gen_range(0..state.num_arms());
        }
        state.best_estimate_arm()
    }
}

// ==================== Epsilon-First ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpsilonFirst {
    exploration_steps: u64,
}

impl EpsilonFirst {
    pub fn new(exploration_steps: u64) -> Self {
        Self { exploration_steps }
    }

    pub fn exploration_steps(&self) -> u64 {
        self.exploration_steps
    }

    /// Last step of the exploration phase; the first `num_arms` steps are the cold start.
    fn exploration_end(&self, num_arms: usize) -> u64 {
        (num_arms as u64).saturating_add(self.exploration_steps)
    }
}

impl Strategy for EpsilonFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EpsilonFirst
    }

    fn select(&self, state: &StrategyState, step: u64, rng: &mut dyn RngCore) -> usize {
        if let Some(arm) = state.first_unpulled() {
            return arm;
        }

        if step <= self.exploration_end(state.num_arms()) {
            return rng.gen_range(0..state.num_arms());
        }
        state.best_estimate_arm()
    }
}
