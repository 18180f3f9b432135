use rand::RngCore;

use super::{Strategy, StrategyKind, StrategyState};

/// Pure exploitation after one pull of every arm. Baseline only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Greedy;

impl Strategy for Greedy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Greedy
    }

    fn select(&self, state: &StrategyState, _step: u64, _rng: &mut dyn RngCore) -> usize {
        state
            .first_unpulled()
            .unwrap_or_else(|| state.best_estimate_arm())
    }
}
