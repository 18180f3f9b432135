//! Study and engine configuration
//!
//! [`StudyConfig`] is the resolved, in-memory description of a study that a
//! CLI or config loader hands to the engine. [`EngineConfig`] carries the
//! process-level knobs read from the environment.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bandit::Study;
use crate::distribution::{Distribution, DistributionKind};
use crate::error::{Result, SimulationError};
use crate::metrics::{aggregate, summarize, AggregateSummary, MetricsSummary};
use crate::simulation::{SimulationEngine, TrialOutcome};
use crate::strategy::{Strategy, StrategyConfig};
use crate::types::MIN_ARMS;

// ==================== Arms ====================

/// One explicitly configured arm
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    pub kind: DistributionKind,
    pub parameter: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_parameter: Option<f64>,
}

impl ArmConfig {
    pub fn new(kind: DistributionKind, parameter: f64) -> Self {
        Self {
            kind,
            parameter,
            secondary_parameter: None,
        }
    }

    pub fn with_secondary(mut self, secondary: f64) -> Self {
        self.secondary_parameter = Some(secondary);
        self
    }

    pub fn build(&self) -> Result<Distribution> {
        Distribution::new(self.kind, self.parameter, self.secondary_parameter)
    }
}

/// Normal(mean, std_dev) prior that generated arm parameters are drawn from
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterPrior {
    pub mean: f64,
    pub std_dev: f64,
}

impl ParameterPrior {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "{name} prior mean must be finite, got {}",
                self.mean
            )));
        }
        if !(self.std_dev.is_finite() && self.std_dev >= 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "{name} prior std_dev must be finite and >= 0, got {}",
                self.std_dev
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArmsConfig {
    /// The same arms in every trial
    Fixed { arms: Vec<ArmConfig> },
    /// Fresh arms per trial, drawn from the trial's random stream
    Generated {
        kind: DistributionKind,
        num_arms: usize,
        parameter: ParameterPrior,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<ParameterPrior>,
    },
}

impl ArmsConfig {
    pub fn num_arms(&self) -> usize {
        match self {
            ArmsConfig::Fixed { arms } => arms.len(),
            ArmsConfig::Generated { num_arms, .. } => *num_arms,
        }
    }
}

// ==================== Study ====================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub arms: ArmsConfig,
    pub strategy: StrategyConfig,
    /// Pull budget G of every trial
    pub num_steps: u64,
    pub num_trials: usize,
    pub seed: u64,
}

impl StudyConfig {
    /// Check everything that can be checked without drawing randomness.
    pub fn validate(&self) -> Result<()> {
        if self.num_steps < 1 {
            return Err(SimulationError::InvalidConfiguration(
                "num_steps must be >= 1".to_string(),
            ));
        }
        if self.num_trials < 1 {
            return Err(SimulationError::InvalidConfiguration(
                "num_trials must be >= 1".to_string(),
            ));
        }
        if self.arms.num_arms() < MIN_ARMS {
            return Err(SimulationError::InvalidConfiguration(format!(
                "a study needs at least {MIN_ARMS} arms, got {}",
                self.arms.num_arms()
            )));
        }

        match &self.arms {
            ArmsConfig::Fixed { arms } => {
                for arm in arms {
                    arm.kind.validate(arm.parameter, arm.secondary_parameter)?;
                }
            }
            ArmsConfig::Generated {
                parameter,
                secondary,
                ..
            } => {
                parameter.validate("parameter")?;
                if let Some(prior) = secondary {
                    prior.validate("secondary")?;
                }
            }
        }

        self.strategy.build().map(|_| ())
    }

    /// The study of one trial; generated arms consume `rng`.
    pub fn build_study<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Study> {
        match &self.arms {
            ArmsConfig::Fixed { arms } => {
                let distributions = arms
                    .iter()
                    .map(ArmConfig::build)
                    .collect::<Result<Vec<_>>>()?;
                Study::new(distributions, self.num_steps)
            }
            ArmsConfig::Generated {
                kind,
                num_arms,
                parameter,
                secondary,
            } => Study::generate(*kind, *num_arms, *parameter, *secondary, self.num_steps, rng),
        }
    }

    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>> {
        self.strategy.build()
    }
}

// ==================== Engine ====================

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run independent trials on rayon's pool
    pub parallel_trials: bool,
    /// Size of a dedicated pool; `None` uses rayon's global pool
    pub num_threads: Option<usize>,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_trials: true,
            num_threads: None,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. `BANDIT_SIM_PARALLEL` is on unless set
    /// to `false` or `0`; `BANDIT_SIM_THREADS` must be a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parallel_trials = lookup("BANDIT_SIM_PARALLEL")
            .map(|value| !(value == "false" || value == "0"))
            .unwrap_or(true);

        let num_threads = lookup("BANDIT_SIM_THREADS")
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|&threads| threads > 0);

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Self {
            parallel_trials,
            num_threads,
            log_level,
        }
    }
}

// ==================== Study Run ====================

/// Everything a reporting layer needs from one study
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudyReport {
    pub trials: Vec<TrialOutcome>,
    pub summaries: Vec<MetricsSummary>,
    pub aggregate: AggregateSummary,
}

/// Validate `config`, run all of its trials and score them.
pub fn run_study(config: &StudyConfig, engine: &SimulationEngine) -> Result<StudyReport> {
    config.validate()?;

    let trials = engine.run_trials(
        |_, rng| config.build_study(rng),
        |_| config.build_strategy(),
        config.num_steps,
        config.num_trials,
        config.seed,
    )?;

    let summaries = trials
        .iter()
        .map(|trial| summarize(&trial.study, &trial.record))
        .collect::<Result<Vec<_>>>()?;
    let aggregate = aggregate(&summaries)?;

    Ok(StudyReport {
        trials,
        summaries,
        aggregate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;

    fn fixed_config() -> StudyConfig {
        StudyConfig {
            arms: ArmsConfig::Fixed {
                arms: vec![
                    ArmConfig::new(DistributionKind::Poisson, 2.0),
                    ArmConfig::new(DistributionKind::Poisson, 4.0),
                ],
            },
            strategy: StrategyConfig::default_for(StrategyKind::Thompson),
            num_steps: 100,
            num_trials: 3,
            seed: 17,
        }
    }

    #[test]
    fn test_validate_rejects_bad_studies() {
        let mut config = fixed_config();
        config.num_steps = 0;
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfiguration(_))
        ));

        let mut config = fixed_config();
        config.arms = ArmsConfig::Fixed {
            arms: vec![ArmConfig::new(DistributionKind::Bernoulli, 0.5)],
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfiguration(_))
        ));

        let mut config = fixed_config();
        config.arms = ArmsConfig::Fixed {
            arms: vec![
                ArmConfig::new(DistributionKind::Bernoulli, 0.5),
                ArmConfig::new(DistributionKind::Bernoulli, 1.5),
            ],
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidParameter { .. })
        ));

        let mut config = fixed_config();
        config.strategy = StrategyConfig::Ucb { confidence: -2.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_study_fixed_arms() {
        let engine = SimulationEngine::new(EngineConfig {
            parallel_trials: false,
            ..Default::default()
        });
        let report = run_study(&fixed_config(), &engine).unwrap();

        assert_eq!(report.trials.len(), 3);
        assert_eq!(report.summaries.len(), 3);
        assert_eq!(report.aggregate.num_steps, 100);
        for trial in &report.trials {
            assert_eq!(trial.study.true_parameters(), vec![2.0, 4.0]);
            assert_eq!(trial.record.strategy, StrategyKind::Thompson);
        }
    }

    #[test]
    fn test_generated_arms_differ_between_trials() {
        let config = StudyConfig {
            arms: ArmsConfig::Generated {
                kind: DistributionKind::Gaussian,
                num_arms: 10,
                parameter: ParameterPrior::new(0.0, 1.0),
                secondary: Some(ParameterPrior::new(1.0, 0.0)),
            },
            strategy: StrategyConfig::default_for(StrategyKind::EpsilonGreedy),
            num_steps: 50,
            num_trials: 2,
            seed: 3,
        };
        let report = run_study(&config, &SimulationEngine::default()).unwrap();
        let first = report.trials[0].study.true_parameters();
        let second = report.trials[1].study.true_parameters();
        assert_eq!(first.len(), 10);
        assert_ne!(first, second);
    }

    #[test]
    fn test_study_config_json_shape() {
        let json = r#"{
            "arms": {
                "type": "fixed",
                "arms": [
                    {"kind": "gaussian", "parameter": 1.0, "secondary_parameter": 1.0},
                    {"kind": "gaussian", "parameter": 2.0, "secondary_parameter": 1.0}
                ]
            },
            "strategy": {"kind": "epsilon_greedy", "schedule": {"type": "inverse", "rate": 0.1}},
            "num_steps": 10,
            "num_trials": 1,
            "seed": 5
        }"#;
        let config: StudyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.arms.num_arms(), 2);
        assert!(matches!(
            config.strategy,
            StrategyConfig::EpsilonGreedy { epsilon, .. } if epsilon == 0.1
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!(config.parallel_trials);
        assert_eq!(config.num_threads, None);
        assert_eq!(config.log_level, "info");
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_engine_config_from_empty_environment() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert!(config.parallel_trials);
        assert_eq!(config.num_threads, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_engine_config_parallel_flag() {
        for off in ["false", "0"] {
            let config = EngineConfig::from_lookup(lookup_from(&[("BANDIT_SIM_PARALLEL", off)]));
            assert!(!config.parallel_trials, "{off}");
        }
        for on in ["true", "1", "yes", "FALSE", ""] {
            let config = EngineConfig::from_lookup(lookup_from(&[("BANDIT_SIM_PARALLEL", on)]));
            assert!(config.parallel_trials, "{on:?}");
        }
    }

    #[test]
    fn test_engine_config_thread_count() {
        let threads = |value: &str| {
            EngineConfig::from_lookup(lookup_from(&[("BANDIT_SIM_THREADS", value)])).num_threads
        };
        assert_eq!(threads("4"), Some(4));
        assert_eq!(threads("0"), None);
        assert_eq!(threads("-2"), None);
        assert_eq!(threads("abc"), None);
        assert_eq!(threads(" 4"), None);
    }

    #[test]
    fn test_engine_config_log_level() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("RUST_LOG", "bandit_sim=debug"),
            ("BANDIT_SIM_THREADS", "2"),
        ]));
        assert_eq!(config.log_level, "bandit_sim=debug");
        assert_eq!(config.num_threads, Some(2));
        assert!(config.parallel_trials);
    }
}
