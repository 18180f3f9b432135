//! Randomized 10-armed Gaussian testbed.
//!
//! Runs every strategy on freshly generated arms (θ ~ N(0, 1), unit noise)
//! and prints one JSON report. Knobs come from the environment:
//! `BANDIT_SIM_STEPS`, `BANDIT_SIM_TRIALS`, `BANDIT_SIM_SEED`, plus the
//! engine settings read by `EngineConfig::from_env`.

use std::process::ExitCode;

use serde_json::json;

use bandit_sim::logging::init_tracing;
use bandit_sim::{
    list_distributions, run_study, ArmsConfig, DistributionKind, EngineConfig, EpsilonSchedule,
    ParameterPrior, SimulationEngine, StrategyConfig, StrategyKind, StudyConfig,
    DEFAULT_DECAY_RATE, DEFAULT_EPSILON,
};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn strategies() -> Vec<StrategyConfig> {
    let mut configs: Vec<StrategyConfig> = StrategyKind::ALL
        .iter()
        .map(|&kind| StrategyConfig::default_for(kind))
        .collect();
    configs.push(StrategyConfig::EpsilonGreedy {
        epsilon: DEFAULT_EPSILON,
        schedule: EpsilonSchedule::Exponential {
            rate: DEFAULT_DECAY_RATE,
        },
    });
    configs
}

fn main() -> ExitCode {
    let engine_config = EngineConfig::from_env();
    let _log_guard = init_tracing(&engine_config);

    let num_steps = env_or("BANDIT_SIM_STEPS", 1000_u64);
    let num_trials = env_or("BANDIT_SIM_TRIALS", 200_usize);
    let seed = env_or("BANDIT_SIM_SEED", 42_u64);

    let engine = SimulationEngine::new(engine_config);
    let mut rows = Vec::new();

    for strategy in strategies() {
        let config = StudyConfig {
            arms: ArmsConfig::Generated {
                kind: DistributionKind::Gaussian,
                num_arms: 10,
                parameter: ParameterPrior::new(0.0, 1.0),
                secondary: Some(ParameterPrior::new(1.0, 0.0)),
            },
            strategy: strategy.clone(),
            num_steps,
            num_trials,
            seed,
        };

        let report = match run_study(&config, &engine) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, strategy = %strategy.kind(), "study failed");
                return ExitCode::FAILURE;
            }
        };

        let aggregate = &report.aggregate;
        tracing::info!(
            strategy = %strategy.kind(),
            final_regret = aggregate.final_regret_mean(),
            optimal_pull_rate = aggregate.final_optimal_pull_rate_mean,
            "study finished"
        );

        let band = aggregate.confidence_band_95();
        rows.push(json!({
            "strategy": strategy,
            "final_regret_mean": aggregate.final_regret_mean(),
            "final_regret_band_95": band.last(),
            "optimal_pull_rate_mean": aggregate.final_optimal_pull_rate_mean,
            "optimal_pull_rate_variance": aggregate.final_optimal_pull_rate_variance,
            "total_reward_mean": aggregate.total_reward_mean,
            "total_reward_variance": aggregate.total_reward_variance,
        }));
    }

    let output = json!({
        "testbed": {
            "arms": 10,
            "steps": num_steps,
            "trials": num_trials,
            "seed": seed,
        },
        "distributions": list_distributions(),
        "results": rows,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to render report");
            ExitCode::FAILURE
        }
    }
}
