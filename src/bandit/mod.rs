//! Arms and Studies
//!
//! A [`Bandit`] owns one hidden [`Distribution`] and the history of its pulls.
//! A [`Study`] is the ordered collection of bandits a strategy plays against;
//! the arm index is the position in that collection.

use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::Serialize;

use crate::config::ParameterPrior;
use crate::distribution::{Distribution, DistributionKind, RunningStats};
use crate::error::{Result, SimulationError};
use crate::sanitize::{clamp_parameter, clamp_secondary};
use crate::types::MIN_ARMS;

// ==================== Bandit ====================

/// A single arm with its true parameters and pull history
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bandit {
    id: usize,
    distribution: Distribution,
    stats: RunningStats,
}

impl Bandit {
    pub fn new(id: usize, distribution: Distribution) -> Self {
        Self {
            id,
            distribution,
            stats: RunningStats::new(),
        }
    }

    /// Pull the arm: sample a reward, then fold it into the history.
    ///
    /// The count and the statistics are replaced together.
    pub fn pull<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let reward = self.distribution.sample(rng);
        self.stats = self.distribution.update_estimate(self.stats, reward);
        reward
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn kind(&self) -> DistributionKind {
        self.distribution.kind()
    }

    pub fn pulls(&self) -> u64 {
        self.stats.count()
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    /// Sum of every reward observed on this arm
    pub fn total_reward(&self) -> f64 {
        self.stats.sum()
    }

    pub fn expected_value(&self) -> f64 {
        self.distribution.expected_value()
    }

    /// Estimated θ from this arm's own history
    pub fn estimate(&self) -> Option<f64> {
        self.kind().estimate(&self.stats)
    }

    pub fn secondary_estimate(&self) -> Option<f64> {
        self.kind().secondary_estimate(&self.stats)
    }

    /// True θ minus estimated θ
    pub fn residual(&self) -> Option<f64> {
        self.estimate().map(|estimate| self.distribution.parameter() - estimate)
    }

    pub fn secondary_residual(&self) -> Option<f64> {
        let truth = self.distribution.secondary_parameter()?;
        self.secondary_estimate().map(|estimate| truth - estimate)
    }

    /// Forget the pull history; the true parameters never change.
    pub fn reset(&mut self) {
        self.stats = RunningStats::new();
    }
}

// ==================== Study ====================

/// An ordered set of arms plus the pull budget of a run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Study {
    bandits: Vec<Bandit>,
    budget: u64,
}

impl Study {
    /// Build a study from per-arm distributions.
    ///
    /// Fails with `InvalidConfiguration` for fewer than two arms or a zero budget.
    pub fn new(distributions: Vec<Distribution>, budget: u64) -> Result<Self> {
        if distributions.len() < MIN_ARMS {
            return Err(SimulationError::InvalidConfiguration(format!(
                "a study needs at least {MIN_ARMS} arms, got {}",
                distributions.len()
            )));
        }
        if budget < 1 {
            return Err(SimulationError::InvalidConfiguration(
                "pull budget must be >= 1".to_string(),
            ));
        }

        let bandits = distributions
            .into_iter()
            .enumerate()
            .map(|(id, distribution)| Bandit::new(id, distribution))
            .collect();

        Ok(Self { bandits, budget })
    }

    /// Build a study whose arm parameters are drawn from `Normal(mean, std_dev)`.
    ///
    /// Draws falling outside the family's domain are clamped into it.
    pub fn generate<R: Rng + ?Sized>(
        kind: DistributionKind,
        num_arms: usize,
        parameter: ParameterPrior,
        secondary: Option<ParameterPrior>,
        budget: u64,
        rng: &mut R,
    ) -> Result<Self> {
        parameter.validate("parameter")?;
        if let Some(prior) = &secondary {
            prior.validate("secondary")?;
        }

        let secondary = match (kind, secondary) {
            (DistributionKind::Gaussian, None) => {
                return Err(SimulationError::invalid_parameter(
                    kind,
                    "generated gaussian arms need a std_dev prior",
                ));
            }
            (DistributionKind::Gaussian, Some(prior)) => Some(prior),
            (_, Some(_)) => {
                return Err(SimulationError::invalid_parameter(
                    kind,
                    "takes a single parameter, got a secondary prior",
                ));
            }
            (_, None) => None,
        };

        let mut distributions = Vec::with_capacity(num_arms);
        for arm in 0..num_arms {
            let raw = parameter.draw(rng);
            let theta = clamp_parameter(kind, raw);
            if theta != raw {
                tracing::warn!(arm, %kind, raw, clamped = theta, "generated parameter clamped into domain");
            }
            let extra = secondary.map(|prior| clamp_secondary(prior.draw(rng)));
            distributions.push(Distribution::new(kind, theta, extra)?);
        }

        Self::new(distributions, budget)
    }

    pub fn len(&self) -> usize {
        self.bandits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bandits.is_empty()
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn bandits(&self) -> &[Bandit] {
        &self.bandits
    }

    pub fn bandit(&self, index: usize) -> Option<&Bandit> {
        self.bandits.get(index)
    }

    /// Pull arm `index`. The engine only passes indices below [`Study::len`].
    pub(crate) fn pull<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> f64 {
        self.bandits[index].pull(rng)
    }

    pub fn kinds(&self) -> Vec<DistributionKind> {
        self.bandits.iter().map(Bandit::kind).collect()
    }

    pub fn true_parameters(&self) -> Vec<f64> {
        self.bandits
            .iter()
            .map(|bandit| bandit.distribution().parameter())
            .collect()
    }

    pub fn expected_values(&self) -> Vec<f64> {
        self.bandits.iter().map(Bandit::expected_value).collect()
    }

    pub fn estimated_parameters(&self) -> Vec<Option<f64>> {
        self.bandits.iter().map(Bandit::estimate).collect()
    }

    pub fn pull_counts(&self) -> Vec<u64> {
        self.bandits.iter().map(Bandit::pulls).collect()
    }

    /// Total pulls across all arms
    pub fn total_pulls(&self) -> u64 {
        self.bandits.iter().map(Bandit::pulls).sum()
    }

    /// Arm with the largest expected value; ties go to the lowest index.
    pub fn optimal_arm_index(&self) -> usize {
        let mut best = 0;
        for (index, bandit) in self.bandits.iter().enumerate().skip(1) {
            if bandit.expected_value() > self.bandits[best].expected_value() {
                best = index;
            }
        }
        best
    }

    pub fn optimal_expected_value(&self) -> f64 {
        self.bandits[self.optimal_arm_index()].expected_value()
    }

    /// Clear every arm's pull history.
    pub fn reset(&mut self) {
        self.bandits.iter_mut().for_each(Bandit::reset);
    }
}

impl ParameterPrior {
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match Normal::new(self.mean, self.std_dev) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bernoulli_study(params: &[f64]) -> Study {
        let distributions = params
            .iter()
            .map(|&p| Distribution::bernoulli(p).unwrap())
            .collect();
        Study::new(distributions, 100).unwrap()
    }

    #[test]
    fn test_pull_updates_count_and_stats() {
        let mut bandit = Bandit::new(0, Distribution::bernoulli(1.0).unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(bandit.estimate(), None);

        for expected in 1..=5 {
            let reward = bandit.pull(&mut rng);
            assert_eq!(reward, 1.0);
            assert_eq!(bandit.pulls(), expected);
        }
        assert_eq!(bandit.total_reward(), 5.0);
        assert_eq!(bandit.estimate(), Some(1.0));
        assert_eq!(bandit.residual(), Some(0.0));
    }

    #[test]
    fn test_gaussian_secondary_residual() {
        let mut bandit = Bandit::new(0, Distribution::gaussian(2.0, 0.5).unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(bandit.secondary_residual(), None);
        for _ in 0..2000 {
            bandit.pull(&mut rng);
        }
        let residual = bandit.secondary_residual().unwrap();
        assert!(residual.abs() < 0.05, "std_dev residual {} too large", residual);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut study = bernoulli_study(&[0.5, 0.5]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        study.pull(0, &mut rng);
        study.pull(1, &mut rng);
        assert_eq!(study.total_pulls(), 2);
        study.reset();
        assert_eq!(study.total_pulls(), 0);
    }

    #[test]
    fn test_study_requires_two_arms() {
        let result = Study::new(vec![Distribution::bernoulli(0.5).unwrap()], 10);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_study_requires_budget() {
        let distributions = vec![
            Distribution::bernoulli(0.5).unwrap(),
            Distribution::bernoulli(0.6).unwrap(),
        ];
        assert!(matches!(
            Study::new(distributions, 0),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_optimal_arm_index() {
        assert_eq!(bernoulli_study(&[0.2, 0.8, 0.5]).optimal_arm_index(), 1);
        assert_eq!(bernoulli_study(&[0.9, 0.1]).optimal_arm_index(), 0);
    }

    #[test]
    fn test_optimal_arm_tie_breaks_to_lowest_index() {
        let study = bernoulli_study(&[0.1, 0.7, 0.3, 0.7]);
        assert_eq!(study.optimal_arm_index(), 1);
        assert_eq!(study.optimal_expected_value(), 0.7);
    }

    #[test]
    fn test_generate_study() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let study = Study::generate(
            DistributionKind::Bernoulli,
            10,
            ParameterPrior::new(0.5, 0.3),
            None,
            50,
            &mut rng,
        )
        .unwrap();

        assert_eq!(study.len(), 10);
        assert!(study
            .true_parameters()
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_generate_gaussian_requires_secondary() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result = Study::generate(
            DistributionKind::Gaussian,
            4,
            ParameterPrior::new(0.0, 1.0),
            None,
            50,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(SimulationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_generate_is_reproducible() {
        let build = || {
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            Study::generate(
                DistributionKind::Gaussian,
                5,
                ParameterPrior::new(0.0, 1.0),
                Some(ParameterPrior::new(1.0, 0.0)),
                10,
                &mut rng,
            )
            .unwrap()
        };
        assert_eq!(build().true_parameters(), build().true_parameters());
    }
}
