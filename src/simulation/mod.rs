//! Simulation Engine
//!
//! One trial is a strictly sequential loop of `select -> pull -> update`:
//! every decision depends on all earlier outcomes, so the steps of a trial are
//! never parallelized. Independent trials share nothing mutable and run on
//! rayon's pool, each with its own ChaCha8 stream derived from the base seed
//! and the trial index.

use std::time::Instant;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bandit::Study;
use crate::config::EngineConfig;
use crate::error::{Result, SimulationError};
use crate::strategy::{Strategy, StrategyKind, StrategyState};

// ==================== Records ====================

/// One step of a trace
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-indexed step number
    pub step: u64,
    pub arm: usize,
    pub reward: f64,
    /// Sum of the rewards of steps `1..=step`
    pub cumulative_reward: f64,
}

/// Full trace of one trial
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub strategy: StrategyKind,
    pub steps: Vec<StepRecord>,
    /// The strategy's estimate of θ per arm after the last step
    pub final_estimates: Vec<Option<f64>>,
    /// Strategy-local pull counts after the last step
    pub pull_counts: Vec<u64>,
}

impl SimulationRecord {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn num_arms(&self) -> usize {
        self.pull_counts.len()
    }

    pub fn total_reward(&self) -> f64 {
        self.steps.last().map_or(0.0, |step| step.cumulative_reward)
    }

    pub fn arms(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().map(|step| step.arm)
    }

    pub fn rewards(&self) -> impl Iterator<Item = f64> + '_ {
        self.steps.iter().map(|step| step.reward)
    }
}

/// A finished trial together with the study it was played on
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub index: usize,
    pub study: Study,
    pub record: SimulationRecord,
}

// ==================== Engine ====================

#[derive(Clone, Debug, Default)]
pub struct SimulationEngine {
    config: EngineConfig,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Independent random stream of trial `trial` under `seed`
    pub fn trial_rng(seed: u64, trial: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(trial as u64);
        rng
    }

    /// Run one trial of `num_steps` pulls from a freshly reset strategy state.
    ///
    /// `num_steps` must equal the study's pull budget. The study's pull
    /// history is cleared first.
    pub fn run<S, R>(
        &self,
        study: &mut Study,
        strategy: &S,
        num_steps: u64,
        rng: &mut R,
    ) -> Result<SimulationRecord>
    where
        S: Strategy + ?Sized,
        R: RngCore,
    {
        let state = strategy.reset(&study.kinds());
        self.run_with_state(study, strategy, state, num_steps, rng)
    }

    /// Run one trial starting from an explicit strategy state.
    ///
    /// Fails before any pull with `InvalidConfiguration` when `num_steps` is not
    /// the study's budget, and with `ConfigurationMismatch` when the state does
    /// not describe the study's arms.
    pub fn run_with_state<S, R>(
        &self,
        study: &mut Study,
        strategy: &S,
        mut state: StrategyState,
        num_steps: u64,
        rng: &mut R,
    ) -> Result<SimulationRecord>
    where
        S: Strategy + ?Sized,
        R: RngCore,
    {
        validate_steps(num_steps)?;
        check_budget(study, num_steps)?;
        check_arms(study, &state)?;

        study.reset();
        debug!(strategy = %strategy.kind(), arms = study.len(), num_steps, "trial started");

        let mut steps = Vec::with_capacity(usize::try_from(num_steps).unwrap_or(0));
        let mut cumulative_reward = 0.0;
        for step in 1..=num_steps {
            // Out-of-range choices fall back to arm 0 so a trial never aborts
            let arm = match strategy.select(&state, step, rng) {
                arm if arm < study.len() => arm,
                _ => 0,
            };
            let reward = study.pull(arm, rng);
            strategy.update(&mut state, arm, reward);
            cumulative_reward += reward;
            steps.push(StepRecord {
                step,
                arm,
                reward,
                cumulative_reward,
            });
        }

        debug!(strategy = %strategy.kind(), cumulative_reward, "trial finished");

        Ok(SimulationRecord {
            strategy: strategy.kind(),
            steps,
            final_estimates: strategy.estimates(&state),
            pull_counts: state.pull_counts(),
        })
    }

    /// Run `num_trials` independent trials.
    ///
    /// Every study and strategy is built up front, so configuration errors
    /// surface before the first pull. Trial `i` draws its study and its pulls
    /// from [`SimulationEngine::trial_rng`]`(seed, i)`; the result is in trial
    /// order and identical in parallel and sequential mode.
    pub fn run_trials<S, SF, PF>(
        &self,
        study_factory: SF,
        strategy_factory: PF,
        num_steps: u64,
        num_trials: usize,
        seed: u64,
    ) -> Result<Vec<TrialOutcome>>
    where
        S: Strategy,
        SF: Fn(usize, &mut ChaCha8Rng) -> Result<Study>,
        PF: Fn(usize) -> Result<S>,
    {
        validate_steps(num_steps)?;
        if num_trials < 1 {
            return Err(SimulationError::InvalidConfiguration(
                "number of trials must be >= 1".to_string(),
            ));
        }

        let mut prepared = Vec::with_capacity(num_trials);
        for index in 0..num_trials {
            let mut rng = Self::trial_rng(seed, index);
            let study = study_factory(index, &mut rng)?;
            let strategy = strategy_factory(index)?;
            check_budget(&study, num_steps)?;
            check_arms(&study, &strategy.reset(&study.kinds()))?;
            prepared.push((index, study, strategy, rng));
        }

        let started = Instant::now();
        let run_one = |(index, mut study, strategy, mut rng): (usize, Study, S, ChaCha8Rng)| {
            self.run(&mut study, &strategy, num_steps, &mut rng)
                .map(|record| TrialOutcome {
                    index,
                    study,
                    record,
                })
        };

        let outcomes: Result<Vec<TrialOutcome>> = if self.config.parallel_trials {
            match self.config.num_threads {
                Some(threads) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()
                        .map_err(|err| {
                            SimulationError::InvalidConfiguration(format!(
                                "failed to build a pool of {threads} threads: {err}"
                            ))
                        })?;
                    pool.install(|| prepared.into_par_iter().map(run_one).collect())
                }
                None => prepared.into_par_iter().map(run_one).collect(),
            }
        } else {
            prepared.into_iter().map(run_one).collect()
        };

        let outcomes = outcomes?;
        info!(
            trials = num_trials,
            steps = num_steps,
            parallel = self.config.parallel_trials,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trials completed"
        );
        Ok(outcomes)
    }
}

fn validate_steps(num_steps: u64) -> Result<()> {
    if num_steps < 1 {
        return Err(SimulationError::InvalidConfiguration(
            "number of steps must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn check_budget(study: &Study, num_steps: u64) -> Result<()> {
    if num_steps != study.budget() {
        return Err(SimulationError::InvalidConfiguration(format!(
            "study budget is {} pulls, asked to run {num_steps} steps",
            study.budget()
        )));
    }
    Ok(())
}

fn check_arms(study: &Study, state: &StrategyState) -> Result<()> {
    if state.num_arms() != study.len() {
        return Err(SimulationError::arm_count_mismatch(
            study.len(),
            state.num_arms(),
        ));
    }
    if state.kinds() != study.kinds() {
        return Err(SimulationError::ConfigurationMismatch {
            expected: format!("{:?}", study.kinds()),
            actual: format!("{:?}", state.kinds()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Distribution, DistributionKind, PriorConfig};
    use crate::strategy::{EpsilonGreedy, Greedy, Ucb};

    fn sequential() -> SimulationEngine {
        SimulationEngine::new(EngineConfig {
            parallel_trials: false,
            ..Default::default()
        })
    }

    fn bernoulli_study(params: &[f64], budget: u64) -> Study {
        let distributions = params
            .iter()
            .map(|&p| Distribution::bernoulli(p).unwrap())
            .collect();
        Study::new(distributions, budget).unwrap()
    }

    #[test]
    fn test_record_shape_and_cumulative_sum() {
        let mut study = bernoulli_study(&[0.3, 0.6, 0.9], 50);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let record = sequential()
            .run(&mut study, &EpsilonGreedy::new(0.1).unwrap(), 50, &mut rng)
            .unwrap();

        assert_eq!(record.len(), 50);
        let mut sum = 0.0;
        for (i, step) in record.steps.iter().enumerate() {
            sum += step.reward;
            assert_eq!(step.step, i as u64 + 1);
            assert_eq!(step.cumulative_reward, sum);
        }
        assert_eq!(record.total_reward(), sum);
        assert_eq!(record.pull_counts.iter().sum::<u64>(), 50);
        assert_eq!(study.pull_counts(), record.pull_counts);
    }

    #[test]
    fn test_cold_start_order() {
        let mut study = bernoulli_study(&[0.5, 0.5, 0.5], 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let record = sequential().run(&mut study, &Greedy, 3, &mut rng).unwrap();
        assert_eq!(record.arms().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut study = bernoulli_study(&[0.5, 0.5], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            sequential().run(&mut study, &Greedy, 0, &mut rng),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_state_arm_count_mismatch() {
        let mut study = bernoulli_study(&[0.5, 0.5], 10);
        let state = StrategyState::new(&[DistributionKind::Bernoulli; 3], &PriorConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = sequential().run_with_state(&mut study, &Greedy, state, 10, &mut rng);
        assert!(matches!(
            result,
            Err(SimulationError::ConfigurationMismatch { .. })
        ));
        assert_eq!(study.total_pulls(), 0);
    }

    #[test]
    fn test_steps_must_match_budget() {
        let mut study = bernoulli_study(&[0.5, 0.5], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            sequential().run(&mut study, &Greedy, 50, &mut rng),
            Err(SimulationError::InvalidConfiguration(_))
        ));
        assert_eq!(study.total_pulls(), 0);

        let record = sequential().run(&mut study, &Greedy, 1, &mut rng).unwrap();
        assert_eq!(record.len() as u64, study.budget());
        assert_eq!(study.total_pulls(), study.budget());
    }

    #[test]
    fn test_trial_budget_checked_before_any_trial() {
        let result = sequential().run_trials(
            |_, _| Ok(bernoulli_study(&[0.5, 0.6], 20)),
            |_| Ok(Greedy),
            10,
            3,
            0,
        );
        assert!(matches!(
            result,
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_trial_streams_are_distinct() {
        let mut a = SimulationEngine::trial_rng(7, 0);
        let mut b = SimulationEngine::trial_rng(7, 1);
        let mut a_again = SimulationEngine::trial_rng(7, 0);
        let first = a.next_u64();
        assert_ne!(first, b.next_u64());
        assert_eq!(first, a_again.next_u64());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let run = |parallel_trials: bool| {
            let engine = SimulationEngine::new(EngineConfig {
                parallel_trials,
                num_threads: Some(2),
                ..Default::default()
            });
            engine
                .run_trials(
                    |_, _| Ok(bernoulli_study(&[0.2, 0.5, 0.7], 200)),
                    |_| Ucb::new(1.0),
                    200,
                    6,
                    99,
                )
                .unwrap()
        };

        let parallel = run(true);
        let sequential = run(false);
        assert_eq!(parallel.len(), 6);
        assert_eq!(parallel, sequential);
        for (index, outcome) in parallel.iter().enumerate() {
            assert_eq!(outcome.index, index);
        }
    }

    #[test]
    fn test_factory_errors_surface_before_running() {
        let result = sequential().run_trials(
            |index, _| {
                if index == 2 {
                    Study::new(vec![Distribution::bernoulli(0.5).unwrap()], 10)
                } else {
                    Ok(bernoulli_study(&[0.5, 0.6], 10))
                }
            },
            |_| Ok(Greedy),
            10,
            4,
            0,
        );
        assert!(matches!(
            result,
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let result = sequential().run_trials(
            |_, _| Ok(bernoulli_study(&[0.5, 0.6], 10)),
            |_| Ok(Greedy),
            10,
            0,
            0,
        );
        assert!(result.is_err());
    }
}
