//! Common Types and Constants
//!
//! Shared constants used across the distribution, strategy and metrics modules.

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Minimum number of arms in a study
pub const MIN_ARMS: usize = 2;

/// Default UCB1 exploration constant `c` in `c * sqrt(2 ln t / n)`
pub const DEFAULT_UCB_CONFIDENCE: f64 = 1.0;

/// Default epsilon for epsilon-greedy
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Default length of the epsilon-first exploration phase, counted after the cold start
pub const DEFAULT_EXPLORATION_STEPS: u64 = 100;

/// Default epsilon decay rate
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// Two-sided 95% normal quantile used for confidence bands
pub const Z_95: f64 = 1.96;

// ==================== Thompson Prior Defaults ====================

/// Beta prior alpha for Bernoulli arms (uniform prior)
pub const DEFAULT_BETA_ALPHA: f64 = 1.0;

/// Beta prior beta for Bernoulli arms (uniform prior)
pub const DEFAULT_BETA_BETA: f64 = 1.0;

/// Normal-Inverse-Gamma prior mean for Gaussian arms
pub const DEFAULT_NORMAL_MEAN: f64 = 0.0;

/// Normal-Inverse-Gamma prior pseudo-count for the mean (weak prior)
pub const DEFAULT_NORMAL_KAPPA: f64 = 0.01;

/// Inverse-Gamma prior shape for Gaussian variance
pub const DEFAULT_INV_GAMMA_SHAPE: f64 = 1.0;

/// Inverse-Gamma prior scale for Gaussian variance
pub const DEFAULT_INV_GAMMA_SCALE: f64 = 1.0;

/// Gamma prior shape on the rate of Poisson and Exponential arms
pub const DEFAULT_GAMMA_SHAPE: f64 = 1.0;

/// Gamma prior rate on the rate of Poisson and Exponential arms
pub const DEFAULT_GAMMA_RATE: f64 = 1.0;
