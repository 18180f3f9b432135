//! Conjugate posteriors used by Thompson sampling
//!
//! Each reward family has one conjugate posterior over its primary parameter:
//! - Bernoulli -> Beta(alpha, beta)
//! - Gaussian -> Normal-Inverse-Gamma(mean, kappa, shape, scale)
//! - Poisson -> Gamma(shape, rate) on the rate
//! - Exponential -> Gamma(shape, rate) on the rate, reported as the mean 1 / rate
//!
//! Updates return a new value; sampling never fails; if a sampler rejects
//! its parameters the posterior mean is returned instead.

use rand::Rng;
use rand_distr::{Beta, Distribution as _, Gamma, Normal};
use serde::{Deserialize, Serialize};

use crate::distribution::DistributionKind;
use crate::error::{Result, SimulationError};
use crate::types::*;

// ==================== Prior Configuration ====================

/// Prior hyperparameters for every supported family
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    /// Beta prior alpha (Bernoulli)
    pub beta_alpha: f64,
    /// Beta prior beta (Bernoulli)
    pub beta_beta: f64,
    /// Prior mean (Gaussian)
    pub normal_mean: f64,
    /// Prior pseudo-observations for the mean (Gaussian)
    pub normal_kappa: f64,
    /// Inverse-Gamma shape for the variance (Gaussian)
    pub inv_gamma_shape: f64,
    /// Inverse-Gamma scale for the variance (Gaussian)
    pub inv_gamma_scale: f64,
    /// Gamma shape on the rate (Poisson, Exponential)
    pub gamma_shape: f64,
    /// Gamma rate on the rate (Poisson, Exponential)
    pub gamma_rate: f64,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            beta_alpha: DEFAULT_BETA_ALPHA,
            beta_beta: DEFAULT_BETA_BETA,
            normal_mean: DEFAULT_NORMAL_MEAN,
            normal_kappa: DEFAULT_NORMAL_KAPPA,
            inv_gamma_shape: DEFAULT_INV_GAMMA_SHAPE,
            inv_gamma_scale: DEFAULT_INV_GAMMA_SCALE,
            gamma_shape: DEFAULT_GAMMA_SHAPE,
            gamma_rate: DEFAULT_GAMMA_RATE,
        }
    }
}

impl PriorConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("beta_alpha", self.beta_alpha),
            ("beta_beta", self.beta_beta),
            ("normal_kappa", self.normal_kappa),
            ("inv_gamma_shape", self.inv_gamma_shape),
            ("inv_gamma_scale", self.inv_gamma_scale),
            ("gamma_shape", self.gamma_shape),
            ("gamma_rate", self.gamma_rate),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "prior {name} must be finite and > 0, got {value}"
                )));
            }
        }
        if !self.normal_mean.is_finite() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "prior normal_mean must be finite, got {}",
                self.normal_mean
            )));
        }
        Ok(())
    }

    /// The starting posterior for an arm of `kind`
    pub fn prior_for(&self, kind: DistributionKind) -> Posterior {
        match kind {
            DistributionKind::Bernoulli => Posterior::Beta {
                alpha: self.beta_alpha,
                beta: self.beta_beta,
            },
            DistributionKind::Gaussian => Posterior::NormalInverseGamma {
                mean: self.normal_mean,
                kappa: self.normal_kappa,
                shape: self.inv_gamma_shape,
                scale: self.inv_gamma_scale,
            },
            DistributionKind::Poisson => Posterior::GammaPoisson {
                shape: self.gamma_shape,
                rate: self.gamma_rate,
            },
            DistributionKind::Exponential => Posterior::GammaExponential {
                shape: self.gamma_shape,
                rate: self.gamma_rate,
            },
        }
    }
}

// ==================== Posterior ====================

/// Posterior belief over one arm's primary parameter
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Posterior {
    Beta {
        alpha: f64,
        beta: f64,
    },
    NormalInverseGamma {
        mean: f64,
        kappa: f64,
        shape: f64,
        scale: f64,
    },
    GammaPoisson {
        shape: f64,
        rate: f64,
    },
    GammaExponential {
        shape: f64,
        rate: f64,
    },
}

impl Posterior {
    /// Fold one (already sanitized) reward into the posterior.
    #[must_use]
    pub fn update(self, reward: f64) -> Self {
        match self {
            // Soft update: exact for 0/1 rewards
            Posterior::Beta { alpha, beta } => Posterior::Beta {
                alpha: alpha + reward,
                beta: beta + (1.0 - reward),
            },
            Posterior::NormalInverseGamma {
                mean,
                kappa,
                shape,
                scale,
            } => {
                let kappa_n = kappa + 1.0;
                let deviation = reward - mean;
                Posterior::NormalInverseGamma {
                    mean: (kappa * mean + reward) / kappa_n,
                    kappa: kappa_n,
                    shape: shape + 0.5,
                    scale: scale + kappa * deviation * deviation / (2.0 * kappa_n),
                }
            }
            Posterior::GammaPoisson { shape, rate } => Posterior::GammaPoisson {
                shape: shape + reward,
                rate: rate + 1.0,
            },
            Posterior::GammaExponential { shape, rate } => Posterior::GammaExponential {
                shape: shape + 1.0,
                rate: rate + reward,
            },
        }
    }

    /// Posterior mean of the primary parameter
    pub fn mean(&self) -> f64 {
        match *self {
            Posterior::Beta { alpha, beta } => {
                let sum = alpha + beta;
                if sum > 0.0 {
                    alpha / sum
                } else {
                    0.5
                }
            }
            Posterior::NormalInverseGamma { mean, .. } => mean,
            Posterior::GammaPoisson { shape, rate } => shape / rate.max(EPSILON),
            // E[1 / rate] exists only for shape > 1
            Posterior::GammaExponential { shape, rate } => {
                if shape > 1.0 {
                    rate / (shape - 1.0)
                } else {
                    rate / shape.max(EPSILON)
                }
            }
        }
    }

    /// Draw one value of the primary parameter from the posterior
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Posterior::Beta { alpha, beta } => match Beta::new(alpha, beta) {
                Ok(dist) => dist.sample(rng),
                Err(_) => self.mean(),
            },
            Posterior::NormalInverseGamma {
                mean,
                kappa,
                shape,
                scale,
            } => {
                let precision = sample_gamma(rng, shape, scale);
                if precision <= EPSILON {
                    return mean;
                }
                let std_dev = (1.0 / (precision * kappa)).sqrt();
                match Normal::new(mean, std_dev) {
                    Ok(dist) => dist.sample(rng),
                    Err(_) => mean,
                }
            }
            Posterior::GammaPoisson { shape, rate } => {
                let draw = sample_gamma(rng, shape, rate);
                if draw > 0.0 {
                    draw
                } else {
                    self.mean()
                }
            }
            Posterior::GammaExponential { shape, rate } => {
                let draw = sample_gamma(rng, shape, rate);
                if draw > EPSILON {
                    1.0 / draw
                } else {
                    self.mean()
                }
            }
        }
    }
}

/// Gamma(shape, rate) draw; 0.0 when the parameters are rejected
fn sample_gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, rate: f64) -> f64 {
    match Gamma::new(shape, 1.0 / rate.max(EPSILON)) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}
