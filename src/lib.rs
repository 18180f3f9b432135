//! # bandit-sim - multi-armed bandit simulation engine
//!
//! This crate runs reproducible simulation studies of the multi-armed bandit
//! problem in pure Rust:
//!
//! - **Distributions** - Bernoulli, Gaussian, Poisson and Exponential reward models
//! - **Strategies** - epsilon-greedy, epsilon-first, UCB1, Thompson sampling, greedy
//! - **Simulation Engine** - sequential pulls within a trial, parallel trials
//! - **Metrics** - regret, optimal-pull rate, estimation error, cross-trial aggregates
//!
//! ## Module layout
//!
//! - [`distribution`] - reward distributions, posteriors, running statistics
//! - [`bandit`] - arms and the study that owns them
//! - [`strategy`] - arm-selection policies and their per-arm state
//! - [`simulation`] - the engine that ties a study and a strategy together
//! - [`metrics`] - per-trial summaries and cross-trial aggregation
//! - [`config`] - resolved study configuration and engine settings
//! - [`sanitize`] - numeric guards
//! - [`error`] - the error type shared by every fallible operation
//! - [`logging`] - tracing subscriber setup for binaries
//! - [`types`] - shared constants
//!
//! ## Example
//!
//! ```rust
//! use bandit_sim::{
//!     ArmConfig, ArmsConfig, DistributionKind, SimulationEngine, StrategyConfig, StudyConfig,
//! };
//!
//! let config = StudyConfig {
//!     arms: ArmsConfig::Fixed {
//!         arms: vec![
//!             ArmConfig::new(DistributionKind::Bernoulli, 0.2),
//!             ArmConfig::new(DistributionKind::Bernoulli, 0.8),
//!         ],
//!     },
//!     strategy: StrategyConfig::Ucb { confidence: 1.0 },
//!     num_steps: 200,
//!     num_trials: 4,
//!     seed: 7,
//! };
//!
//! let report = bandit_sim::run_study(&config, &SimulationEngine::default()).unwrap();
//! assert_eq!(report.trials.len(), 4);
//! assert_eq!(report.aggregate.num_trials, 4);
//! ```

// ============================================================================
// Module declarations
// ============================================================================

pub mod bandit;
pub mod config;
pub mod distribution;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod sanitize;
pub mod simulation;
pub mod strategy;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use error::{Result, SimulationError};

pub use distribution::{
    list_distributions, Distribution, DistributionInfo, DistributionKind, ParameterSpec,
    Posterior, RunningStats,
};

pub use bandit::{Bandit, Study};

pub use strategy::{
    ArmEstimate, EpsilonFirst, EpsilonGreedy, EpsilonSchedule, Greedy, PriorConfig, Strategy,
    StrategyConfig, StrategyKind, StrategyState, Thompson, Ucb,
};

pub use simulation::{SimulationEngine, SimulationRecord, StepRecord, TrialOutcome};

pub use metrics::{aggregate, summarize, AggregateSummary, MetricsSummary};

pub use config::{
    run_study, ArmConfig, ArmsConfig, EngineConfig, ParameterPrior, StudyConfig, StudyReport,
};
