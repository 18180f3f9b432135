//! Metrics Aggregator
//!
//! Pure functions that score a finished trace:
//! - [`summarize`]: regret, optimal-pull rate and estimation error of one trial
//! - [`aggregate`]: elementwise mean/variance across trials, for confidence bands
//!
//! Regret is measured in expected reward, so it never depends on sampling noise.

use serde::{Deserialize, Serialize};

use crate::bandit::Study;
use crate::distribution::RunningStats;
use crate::error::{Result, SimulationError};
use crate::sanitize::safe_ratio;
use crate::simulation::SimulationRecord;
use crate::strategy::StrategyKind;
use crate::types::Z_95;

// ==================== Single Trial ====================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub strategy: StrategyKind,
    pub num_steps: usize,
    pub total_reward: f64,
    pub optimal_arm: usize,
    /// Optimal expected reward minus the chosen arm's expected reward, per step
    pub instantaneous_regret: Vec<f64>,
    pub cumulative_regret: Vec<f64>,
    /// Fraction of all steps spent on the optimal arm
    pub optimal_pull_rate: f64,
    /// Fraction of steps `1..=g` spent on the optimal arm, per step `g`
    pub optimal_pull_rate_series: Vec<f64>,
    /// Cumulative reward at step `g` divided by `g`
    pub average_reward_series: Vec<f64>,
    pub pull_counts: Vec<u64>,
    pub pull_share: Vec<f64>,
    /// |final estimate - true θ| per arm, `None` for arms never pulled
    pub estimation_errors: Vec<Option<f64>>,
    /// |estimated - true| secondary parameter per arm, where the family has one
    pub secondary_estimation_errors: Vec<Option<f64>>,
    /// Mean absolute estimation error over the arms with an estimate
    pub mae: Option<f64>,
    /// Mean absolute percentage error over the arms with a non-zero θ
    pub mape: Option<f64>,
    /// Mean of `secondary_estimation_errors`, `None` when no arm has one
    pub secondary_mae: Option<f64>,
    /// As `mape`, against the true secondary parameter
    pub secondary_mape: Option<f64>,
}

impl MetricsSummary {
    pub fn final_regret(&self) -> f64 {
        self.cumulative_regret.last().copied().unwrap_or(0.0)
    }
}

/// Score one trial against the study it was played on.
pub fn summarize(study: &Study, record: &SimulationRecord) -> Result<MetricsSummary> {
    if record.num_arms() != study.len() || record.final_estimates.len() != study.len() {
        return Err(SimulationError::arm_count_mismatch(
            study.len(),
            record.num_arms(),
        ));
    }
    if let Some(step) = record.steps.iter().find(|step| step.arm >= study.len()) {
        return Err(SimulationError::ConfigurationMismatch {
            expected: format!("arm index below {}", study.len()),
            actual: format!("arm {} at step {}", step.arm, step.step),
        });
    }

    let expected = study.expected_values();
    let optimal_arm = study.optimal_arm_index();
    let optimal_value = expected[optimal_arm];
    let num_steps = record.len();

    let mut instantaneous_regret = Vec::with_capacity(num_steps);
    let mut cumulative_regret = Vec::with_capacity(num_steps);
    let mut optimal_pull_rate_series = Vec::with_capacity(num_steps);
    let mut average_reward_series = Vec::with_capacity(num_steps);

    let mut regret_sum = 0.0;
    let mut optimal_pulls = 0_u64;
    for (i, step) in record.steps.iter().enumerate() {
        let regret = (optimal_value - expected[step.arm]).max(0.0);
        regret_sum += regret;
        if step.arm == optimal_arm {
            optimal_pulls += 1;
        }
        let elapsed = (i + 1) as f64;

        instantaneous_regret.push(regret);
        cumulative_regret.push(regret_sum);
        optimal_pull_rate_series.push(optimal_pulls as f64 / elapsed);
        average_reward_series.push(step.cumulative_reward / elapsed);
    }

    let optimal_pull_rate = optimal_pull_rate_series.last().copied().unwrap_or(0.0);
    let pull_share = record
        .pull_counts
        .iter()
        .map(|&count| safe_ratio(count as f64, num_steps as f64).unwrap_or(0.0))
        .collect();

    let truths = study.true_parameters();
    let estimation_errors: Vec<Option<f64>> = record
        .final_estimates
        .iter()
        .zip(&truths)
        .map(|(estimate, truth)| estimate.map(|estimate| (estimate - truth).abs()))
        .collect();
    let secondary_truths: Vec<Option<f64>> = study
        .bandits()
        .iter()
        .map(|bandit| bandit.distribution().secondary_parameter())
        .collect();
    let secondary_estimation_errors: Vec<Option<f64>> = study
        .bandits()
        .iter()
        .map(|bandit| bandit.secondary_residual().map(f64::abs))
        .collect();

    let (mae, mape) = error_means(&estimation_errors, truths.iter().copied().map(Some));
    let (secondary_mae, secondary_mape) =
        error_means(&secondary_estimation_errors, secondary_truths.iter().copied());

    Ok(MetricsSummary {
        strategy: record.strategy,
        num_steps,
        total_reward: record.total_reward(),
        optimal_arm,
        instantaneous_regret,
        cumulative_regret,
        optimal_pull_rate,
        optimal_pull_rate_series,
        average_reward_series,
        pull_counts: record.pull_counts.clone(),
        pull_share,
        estimation_errors,
        secondary_estimation_errors,
        mae,
        mape,
        secondary_mae,
        secondary_mape,
    })
}

/// Mean absolute error and mean absolute percentage error of per-arm errors.
/// Arms whose truth is zero (or absent) drop out of the percentage.
fn error_means<I>(errors: &[Option<f64>], truths: I) -> (Option<f64>, Option<f64>)
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mae = errors
        .iter()
        .flatten()
        .copied()
        .collect::<RunningStats>()
        .mean();
    let mape = errors
        .iter()
        .zip(truths)
        .filter_map(|(error, truth)| safe_ratio((*error)?, truth?.abs()))
        .map(|ratio| ratio * 100.0)
        .collect::<RunningStats>()
        .mean();
    (mae, mape)
}

// ==================== Across Trials ====================

/// Elementwise statistics of a set of trials of equal length
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub strategy: StrategyKind,
    pub num_trials: usize,
    pub num_steps: usize,
    pub cumulative_regret_mean: Vec<f64>,
    /// Population variance across trials
    pub cumulative_regret_variance: Vec<f64>,
    pub optimal_pull_rate_mean: Vec<f64>,
    pub optimal_pull_rate_variance: Vec<f64>,
    pub final_optimal_pull_rate_mean: f64,
    pub final_optimal_pull_rate_variance: f64,
    pub total_reward_mean: f64,
    pub total_reward_variance: f64,
}

impl AggregateSummary {
    /// Normal-approximation band `mean ± z * sd / sqrt(n)` around the
    /// cumulative regret, as `(lower, upper)` per step.
    pub fn confidence_band(&self, z: f64) -> Vec<(f64, f64)> {
        let n = self.num_trials.max(1) as f64;
        self.cumulative_regret_mean
            .iter()
            .zip(&self.cumulative_regret_variance)
            .map(|(&mean, &variance)| {
                let half_width = z * (variance / n).sqrt();
                (mean - half_width, mean + half_width)
            })
            .collect()
    }

    /// [`AggregateSummary::confidence_band`] at 95%
    pub fn confidence_band_95(&self) -> Vec<(f64, f64)> {
        self.confidence_band(Z_95)
    }

    pub fn final_regret_mean(&self) -> f64 {
        self.cumulative_regret_mean.last().copied().unwrap_or(0.0)
    }
}

/// Combine per-trial summaries.
///
/// Fails on an empty input, and with `ConfigurationMismatch` when the trials
/// differ in length or strategy.
pub fn aggregate(summaries: &[MetricsSummary]) -> Result<AggregateSummary> {
    let first = summaries.first().ok_or_else(|| {
        SimulationError::InvalidConfiguration("cannot aggregate zero trials".to_string())
    })?;

    for summary in summaries {
        if summary.num_steps != first.num_steps {
            return Err(SimulationError::ConfigurationMismatch {
                expected: format!("{} steps", first.num_steps),
                actual: format!("{} steps", summary.num_steps),
            });
        }
        if summary.strategy != first.strategy {
            return Err(SimulationError::ConfigurationMismatch {
                expected: first.strategy.to_string(),
                actual: summary.strategy.to_string(),
            });
        }
    }

    let (cumulative_regret_mean, cumulative_regret_variance) =
        elementwise(summaries, first.num_steps, |s| &s.cumulative_regret);
    let (optimal_pull_rate_mean, optimal_pull_rate_variance) =
        elementwise(summaries, first.num_steps, |s| &s.optimal_pull_rate_series);

    let rates: RunningStats = summaries.iter().map(|s| s.optimal_pull_rate).collect();
    let rewards: RunningStats = summaries.iter().map(|s| s.total_reward).collect();

    Ok(AggregateSummary {
        strategy: first.strategy,
        num_trials: summaries.len(),
        num_steps: first.num_steps,
        cumulative_regret_mean,
        cumulative_regret_variance,
        optimal_pull_rate_mean,
        optimal_pull_rate_variance,
        final_optimal_pull_rate_mean: rates.mean().unwrap_or(0.0),
        final_optimal_pull_rate_variance: rates.variance().unwrap_or(0.0),
        total_reward_mean: rewards.mean().unwrap_or(0.0),
        total_reward_variance: rewards.variance().unwrap_or(0.0),
    })
}

fn elementwise<F>(summaries: &[MetricsSummary], len: usize, series: F) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(&MetricsSummary) -> &Vec<f64>,
{
    let mut columns = vec![RunningStats::new(); len];
    for summary in summaries {
        for (column, &value) in columns.iter_mut().zip(series(summary)) {
            *column = column.push(value);
        }
    }
    columns
        .iter()
        .map(|column| {
            (
                column.mean().unwrap_or(0.0),
                column.variance().unwrap_or(0.0),
            )
        })
        .unzip()
}
