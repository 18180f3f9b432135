//! Thompson sampling
//!
//! Every arm keeps a conjugate posterior over its primary parameter. Each step
//! one value is drawn per arm and the arm with the largest draw is pulled.
//!
//! Priors (overridable through [`PriorConfig`]):
//! - Bernoulli: Beta(1, 1)
//! - Gaussian: Normal-Inverse-Gamma(0, 0.01, 1, 1)
//! - Poisson / Exponential: Gamma(1, 1) on the rate

use rand::RngCore;

use super::{argmax, Strategy, StrategyKind, StrategyState};
use crate::distribution::{DistributionKind, PriorConfig};
use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Thompson {
    prior: PriorConfig,
}

impl Thompson {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prior(prior: PriorConfig) -> Result<Self> {
        prior.validate()?;
        Ok(Self { prior })
    }

    pub fn prior(&self) -> &PriorConfig {
        &self.prior
    }
}

impl Strategy for Thompson {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Thompson
    }

    fn reset(&self, arms: &[DistributionKind]) -> StrategyState {
        StrategyState::new(arms, &self.prior)
    }

    fn select(&self, state: &StrategyState, _step: u64, rng: &mut dyn RngCore) -> usize {
        if let Some(arm) = state.first_unpulled() {
            return arm;
        }
        let draws: Vec<f64> = state
            .arms()
            .iter()
            .map(|arm| arm.posterior().sample(rng))
            .collect();
        argmax(draws)
    }

    /// Posterior mean, reported once the arm has been pulled
    fn estimate(&self, state: &StrategyState, arm: usize) -> Option<f64> {
        state
            .arm(arm)
            .filter(|arm| arm.pulls() > 0)
            .map(|arm| arm.posterior().mean())
    }
}
