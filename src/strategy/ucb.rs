use rand::RngCore;

use super::{argmax, Strategy, StrategyKind, StrategyState};
use crate::error::{Result, SimulationError};
use crate::types::DEFAULT_UCB_CONFIDENCE;

/// UCB1: pick the arm maximizing `mean + c * sqrt(2 ln t / n)`.
///
/// `t` is the 1-indexed step about to be played and `n` the arm's pull count.
/// An arm with `n == 0` has an infinite bonus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ucb {
    confidence: f64,
}

impl Ucb {
    pub fn new(confidence: f64) -> Result<Self> {
        if !(confidence.is_finite() && confidence >= 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "ucb confidence must be finite and >= 0, got {confidence}"
            )));
        }
        Ok(Self { confidence })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Upper confidence bound of every arm at `step`
    pub fn scores(&self, state: &StrategyState, step: u64) -> Vec<f64> {
        let log_t = (step.max(1) as f64).ln();
        state
            .arms()
            .iter()
            .map(|arm| match arm.estimate() {
                Some(mean) if arm.pulls() > 0 => {
                    mean + self.confidence * (2.0 * log_t / arm.pulls() as f64).sqrt()
                }
                _ => f64::INFINITY,
            })
            .collect()
    }
}

impl Default for Ucb {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_UCB_CONFIDENCE,
        }
    }
}

impl Strategy for Ucb {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ucb
    }

    fn select(&self, state: &StrategyState, step: u64, _rng: &mut dyn RngCore) -> usize {
        if let Some(arm) = state.first_unpulled() {
            return arm;
        }
        argmax(self.scores(state, step))
    }
}
