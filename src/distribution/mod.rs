//! Reward Distributions
//!
//! A [`Distribution`] is the hidden reward model of one arm. Every supported
//! family is parameterized so that its primary parameter θ equals its
//! expected reward:
//!
//! | kind        | θ (primary)  | secondary | domain               |
//! |-------------|--------------|-----------|----------------------|
//! | bernoulli   | p            | -         | 0 <= p <= 1          |
//! | gaussian    | mean         | std_dev   | mean finite, sd >= 0 |
//! | poisson     | rate         | -         | rate > 0             |
//! | exponential | mean (1/λ)   | -         | mean > 0             |
//!
//! Sampling always draws from a caller-supplied random source, so a run is a
//! pure function of its seed.

mod posterior;
mod stats;

pub use posterior::{Posterior, PriorConfig};
pub use stats::RunningStats;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Bernoulli, Distribution as _, Exp, Normal, Poisson};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::sanitize::sanitize_reward;

// ==================== Distribution Kind ====================

/// Supported reward families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    Bernoulli,
    Gaussian,
    Poisson,
    Exponential,
}

impl DistributionKind {
    pub const ALL: [DistributionKind; 4] = [
        DistributionKind::Bernoulli,
        DistributionKind::Gaussian,
        DistributionKind::Poisson,
        DistributionKind::Exponential,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DistributionKind::Bernoulli => "bernoulli",
            DistributionKind::Gaussian => "gaussian",
            DistributionKind::Poisson => "poisson",
            DistributionKind::Exponential => "exponential",
        }
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters().len()
    }

    /// Static parameter metadata, primary parameter first
    pub fn parameters(&self) -> &'static [ParameterSpec] {
        match self {
            DistributionKind::Bernoulli => &[ParameterSpec {
                name: "p",
                domain: "0 <= p <= 1",
                description: "success probability",
            }],
            DistributionKind::Gaussian => &[
                ParameterSpec {
                    name: "mean",
                    domain: "finite",
                    description: "location of the reward",
                },
                ParameterSpec {
                    name: "std_dev",
                    domain: "std_dev >= 0",
                    description: "spread of the reward",
                },
            ],
            DistributionKind::Poisson => &[ParameterSpec {
                name: "rate",
                domain: "rate > 0",
                description: "expected event count per pull",
            }],
            DistributionKind::Exponential => &[ParameterSpec {
                name: "mean",
                domain: "mean > 0",
                description: "expected waiting time (1 / rate)",
            }],
        }
    }

    /// Check `parameter` (and `secondary`) against this family's domain.
    pub fn validate(&self, parameter: f64, secondary: Option<f64>) -> Result<()> {
        if !parameter.is_finite() {
            return Err(SimulationError::invalid_parameter(
                *self,
                format!("{} must be finite, got {parameter}", self.parameters()[0].name),
            ));
        }

        match (self, secondary) {
            (DistributionKind::Gaussian, None) => {
                return Err(SimulationError::invalid_parameter(
                    *self,
                    "std_dev is required",
                ));
            }
            (DistributionKind::Gaussian, Some(std_dev)) => {
                if !(std_dev.is_finite() && std_dev >= 0.0) {
                    return Err(SimulationError::invalid_parameter(
                        *self,
                        format!("std_dev must be finite and >= 0, got {std_dev}"),
                    ));
                }
            }
            (_, Some(extra)) => {
                return Err(SimulationError::invalid_parameter(
                    *self,
                    format!("takes a single parameter, got secondary {extra}"),
                ));
            }
            (_, None) => {}
        }

        let in_domain = match self {
            DistributionKind::Bernoulli => (0.0..=1.0).contains(&parameter),
            DistributionKind::Gaussian => true,
            DistributionKind::Poisson | DistributionKind::Exponential => parameter > 0.0,
        };
        if !in_domain {
            let spec = &self.parameters()[0];
            return Err(SimulationError::invalid_parameter(
                *self,
                format!("{} must satisfy {}, got {parameter}", spec.name, spec.domain),
            ));
        }

        Ok(())
    }

    /// Fold one reward into running sufficient statistics.
    ///
    /// The reward is first clamped to the family's support.
    #[must_use]
    pub fn update_estimate(&self, stats: RunningStats, reward: f64) -> RunningStats {
        stats.push(sanitize_reward(*self, reward))
    }

    /// Point estimate of θ. Every family is parameterized by its mean, so this
    /// is the sample mean (the MLE).
    pub fn estimate(&self, stats: &RunningStats) -> Option<f64> {
        stats.mean()
    }

    /// Point estimate of the secondary parameter, if the family has one
    pub fn secondary_estimate(&self, stats: &RunningStats) -> Option<f64> {
        match self {
            DistributionKind::Gaussian => stats.std_dev(),
            _ => None,
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistributionKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bernoulli" => Ok(DistributionKind::Bernoulli),
            "gaussian" | "normal" => Ok(DistributionKind::Gaussian),
            "poisson" => Ok(DistributionKind::Poisson),
            "exponential" => Ok(DistributionKind::Exponential),
            _ => Err(SimulationError::UnsupportedDistribution(s.to_string())),
        }
    }
}

// ==================== Metadata ====================

/// Description of one parameter of a family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub domain: &'static str,
    pub description: &'static str,
}

/// Discovery record for one supported family
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DistributionInfo {
    pub kind: DistributionKind,
    pub parameters: &'static [ParameterSpec],
}

/// Every supported family with its parameters and validity domains
pub fn list_distributions() -> Vec<DistributionInfo> {
    DistributionKind::ALL
        .iter()
        .map(|&kind| DistributionInfo {
            kind,
            parameters: kind.parameters(),
        })
        .collect()
}

// ==================== Distribution ====================

/// A validated reward distribution with fixed true parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Distribution {
    kind: DistributionKind,
    parameter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary: Option<f64>,
}

impl Distribution {
    /// Build a distribution, failing with `InvalidParameter` outside the domain.
    pub fn new(kind: DistributionKind, parameter: f64, secondary: Option<f64>) -> Result<Self> {
        kind.validate(parameter, secondary)?;
        Ok(Self {
            kind,
            parameter,
            secondary,
        })
    }

    pub fn bernoulli(p: f64) -> Result<Self> {
        Self::new(DistributionKind::Bernoulli, p, None)
    }

    pub fn gaussian(mean: f64, std_dev: f64) -> Result<Self> {
        Self::new(DistributionKind::Gaussian, mean, Some(std_dev))
    }

    pub fn poisson(rate: f64) -> Result<Self> {
        Self::new(DistributionKind::Poisson, rate, None)
    }

    pub fn exponential(mean: f64) -> Result<Self> {
        Self::new(DistributionKind::Exponential, mean, None)
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    /// True primary parameter θ
    pub fn parameter(&self) -> f64 {
        self.parameter
    }

    /// True secondary parameter, if the family has one
    pub fn secondary_parameter(&self) -> Option<f64> {
        self.secondary
    }

    /// Analytic mean of the reward
    pub fn expected_value(&self) -> f64 {
        self.parameter
    }

    /// Analytic variance of the reward
    pub fn variance(&self) -> f64 {
        match self.kind {
            DistributionKind::Bernoulli => self.parameter * (1.0 - self.parameter),
            DistributionKind::Gaussian => self.secondary.map_or(0.0, |sd| sd * sd),
            DistributionKind::Poisson => self.parameter,
            DistributionKind::Exponential => self.parameter * self.parameter,
        }
    }

    /// Draw one reward.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let theta = self.parameter;
        match self.kind {
            DistributionKind::Bernoulli => match Bernoulli::new(theta) {
                Ok(dist) => {
                    if dist.sample(rng) {
                        1.0
                    } else {
                        0.0
                    }
                }
                Err(_) => theta,
            },
            DistributionKind::Gaussian => {
                match Normal::new(theta, self.secondary.unwrap_or(0.0)) {
                    Ok(dist) => dist.sample(rng),
                    Err(_) => theta,
                }
            }
            DistributionKind::Poisson => match Poisson::new(theta) {
                Ok(dist) => dist.sample(rng),
                Err(_) => theta,
            },
            DistributionKind::Exponential => match Exp::new(1.0 / theta) {
                Ok(dist) => dist.sample(rng),
                Err(_) => theta,
            },
        }
    }

    /// Fold a reward into running statistics (see [`DistributionKind::update_estimate`]).
    #[must_use]
    pub fn update_estimate(&self, stats: RunningStats, reward: f64) -> RunningStats {
        self.kind.update_estimate(stats, reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_mean(dist: &Distribution, n: usize, seed: u64) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let stats: RunningStats = (0..n).map(|_| dist.sample(&mut rng)).collect();
        stats.mean().unwrap_or(f64::NAN)
    }

    #[test]
    fn test_parameter_domains() {
        assert!(Distribution::bernoulli(0.0).is_ok());
        assert!(Distribution::bernoulli(1.0).is_ok());
        assert!(Distribution::bernoulli(1.2).is_err());
        assert!(Distribution::bernoulli(-0.1).is_err());
        assert!(Distribution::gaussian(-5.0, 2.0).is_ok());
        assert!(Distribution::gaussian(0.0, -1.0).is_err());
        assert!(Distribution::poisson(0.0).is_err());
        assert!(Distribution::poisson(3.5).is_ok());
        assert!(Distribution::exponential(0.0).is_err());
        assert!(Distribution::exponential(f64::INFINITY).is_err());
        assert!(Distribution::bernoulli(f64::NAN).is_err());
    }

    #[test]
    fn test_invalid_parameter_error_kind() {
        let err = Distribution::poisson(-1.0).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter {
                distribution: DistributionKind::Poisson,
                ..
            }
        ));
    }

    #[test]
    fn test_parameter_count_checked() {
        assert!(Distribution::new(DistributionKind::Gaussian, 1.0, None).is_err());
        assert!(Distribution::new(DistributionKind::Bernoulli, 0.5, Some(0.1)).is_err());
    }

    #[test]
    fn test_expected_value_is_primary_parameter() {
        for dist in [
            Distribution::bernoulli(0.3).unwrap(),
            Distribution::gaussian(-2.0, 1.0).unwrap(),
            Distribution::poisson(4.0).unwrap(),
            Distribution::exponential(2.5).unwrap(),
        ] {
            assert_eq!(dist.expected_value(), dist.parameter());
        }
    }

    #[test]
    fn test_samples_match_expected_value() {
        let cases = [
            (Distribution::bernoulli(0.3).unwrap(), 0.05),
            (Distribution::gaussian(-2.0, 1.0).unwrap(), 0.1),
            (Distribution::poisson(4.0).unwrap(), 0.15),
            (Distribution::exponential(2.5).unwrap(), 0.15),
        ];
        for (dist, tolerance) in cases {
            let mean = sample_mean(&dist, 5000, 42);
            assert!(
                (mean - dist.expected_value()).abs() < tolerance,
                "{} sample mean {} too far from {}",
                dist.kind(),
                mean,
                dist.expected_value()
            );
        }
    }

    #[test]
    fn test_bernoulli_samples_are_binary() {
        let dist = Distribution::bernoulli(0.5).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let reward = dist.sample(&mut rng);
            assert!(reward == 0.0 || reward == 1.0);
        }
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let dist = Distribution::gaussian(1.0, 3.0).unwrap();
        let mut rng1 = ChaCha8Rng::seed_from_u64(99);
        let mut rng2 = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(dist.sample(&mut rng1), dist.sample(&mut rng2));
        }
    }

    #[test]
    fn test_update_estimate() {
        let dist = Distribution::gaussian(0.0, 1.0).unwrap();
        let stats = dist.update_estimate(RunningStats::new(), 1.0);
        let stats = dist.update_estimate(stats, 3.0);
        assert_eq!(dist.kind().estimate(&stats), Some(2.0));
        assert_eq!(dist.kind().secondary_estimate(&stats), Some(1.0));
        assert_eq!(DistributionKind::Poisson.secondary_estimate(&stats), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Gaussian".parse::<DistributionKind>(), Ok(DistributionKind::Gaussian));
        assert_eq!("normal".parse::<DistributionKind>(), Ok(DistributionKind::Gaussian));
        assert!(matches!(
            "cauchy".parse::<DistributionKind>(),
            Err(SimulationError::UnsupportedDistribution(_))
        ));
    }

    #[test]
    fn test_list_distributions() {
        let infos = list_distributions();
        assert_eq!(infos.len(), 4);
        let gaussian = infos
            .iter()
            .find(|info| info.kind == DistributionKind::Gaussian)
            .unwrap();
        assert_eq!(gaussian.parameters.len(), 2);
        assert_eq!(gaussian.parameters[1].name, "std_dev");
    }
}
