use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::accumulator::{EventResult, PhaseAccumulator};
use crate::events::RiskEvent;
use crate::sampling::{base_probability, perturb_probability, sample_cost, sample_impact};

/// Lifecycle of one phase on the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Idle,
    /// Worker count fixed and trials partitioned.
    Spawned,
    Running,
    /// All workers finished and merged.
    Joined,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CostBounds {
    lower: f64,
    lower_std_dev: Option<f64>,
    upper: f64,
    upper_std_dev: Option<f64>,
}

/// Everything about an event that stays fixed for a phase, resolved once so
/// the trial loop only does the stochastic part.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEvent {
    pub base_probability: f64,
    pub confidence_std_dev: Option<f64>,
    /// Product of the conditional factors from finalised prerequisites; 1 for
    /// independent events.
    pub dependency_factor: f64,
    pub impact: Option<(f64, f64)>,
    pub is_cost_saving: bool,
    cost: Option<CostBounds>,
}

impl PreparedEvent {
    pub fn new(event: &RiskEvent, dependency_factor: f64) -> Self {
        let cost = match (event.cost_of_implementation_lower, event.cost_of_implementation_upper) {
            (Some(lower), Some(upper)) if event.is_cost_saving => Some(CostBounds {
                lower,
                lower_std_dev: event.cost_of_implementation_lower_std_dev,
                upper,
                upper_std_dev: event.cost_of_implementation_upper_std_dev,
            }),
            _ => None,
        };
        PreparedEvent {
            base_probability: base_probability(event),
            confidence_std_dev: event.confidence_std_dev,
            dependency_factor,
            impact: event.impact_bounds(),
            is_cost_saving: event.is_cost_saving,
            cost,
        }
    }

    /// Normalised base → perturbation → dependency scaling, clamped to `[0, 1]`.
    #[inline]
    fn probability(&self, rng: &mut impl Rng) -> f64 {
        let p = match self.confidence_std_dev {
            Some(sd) => perturb_probability(self.base_probability, sd, rng),
            None => self.base_probability,
        };
        (p * self.dependency_factor).clamp(0.0, 1.0)
    }

    #[inline]
    fn run_trial(&self, slot: &mut EventResult, rng: &mut impl Rng) {
        let p = self.probability(rng);

        if let Some(cost) = &self.cost {
            let lower = sample_cost(cost.lower, cost.lower_std_dev, rng);
            let upper = sample_cost(cost.upper, cost.upper_std_dev, rng);
            slot.record_cost(lower, upper);
        }

        if rng.random::<f64>() < p {
            let impact = self.impact.map_or(0.0, |bounds| {
                sample_impact(bounds, self.confidence_std_dev, self.is_cost_saving, rng)
            });
            slot.record_occurrence(impact);
        }
    }
}

/// Merged output of one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub accumulator: PhaseAccumulator,
    pub workers: usize,
    pub trials_per_worker: u64,
}

impl PhaseOutcome {
    pub fn trials_executed(&self) -> u64 {
        self.accumulator.trials
    }
}

/// Runs one phase at a time across a fixed set of workers.
///
/// Each worker owns a ChaCha20 stream derived from the run seed and a private
/// [`PhaseAccumulator`], so the trial loop takes no locks. Workers get
/// `trials / workers` trials each; the remainder is dropped, not redistributed.
pub struct TrialExecutor {
    seed: u64,
    workers: Option<usize>,
    state: PhaseState,
}

impl TrialExecutor {
    /// `workers = None` sizes the pool from the rayon thread count at the
    /// start of each phase.
    pub fn new(seed: u64, workers: Option<usize>) -> Self {
        TrialExecutor { seed, workers, state: PhaseState::Idle }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    fn transition(&mut self, phase: u32, next: PhaseState) {
        debug!(phase, from = ?self.state, to = ?next, "executor state");
        self.state = next;
    }

    /// Run `trials` trials of `events` and return the merged accumulator.
    /// Blocks until every worker has finished, then folds their accumulators
    /// in worker order so a given seed and worker count reproduce the same sums.
    pub fn run_phase(&mut self, phase: u32, events: &[PreparedEvent], trials: u64) -> PhaseOutcome {
        self.state = PhaseState::Idle;

        let workers = self.workers.unwrap_or_else(rayon::current_num_threads).max(1);
        let trials_per_worker = trials / workers as u64;
        let executed = trials_per_worker * workers as u64;
        if executed != trials {
            warn!(
                phase,
                requested = trials,
                executed,
                workers,
                "trial count truncated to a multiple of the worker count"
            );
        }
        self.transition(phase, PhaseState::Spawned);

        let seed = self.seed;
        self.transition(phase, PhaseState::Running);
        let partials: Vec<PhaseAccumulator> = (0..workers)
            .into_par_iter()
            .map(|worker| {
                let stream = (u64::from(phase) << 32) | worker as u64;
                let acc = run_worker(seed, stream, events, trials_per_worker);
                debug!(phase, worker, trials = acc.trials, "worker finished");
                acc
            })
            .collect();

        let accumulator = partials
            .into_iter()
            .fold(PhaseAccumulator::new(events.len()), PhaseAccumulator::merge);
        self.transition(phase, PhaseState::Joined);

        let outcome = PhaseOutcome { accumulator, workers, trials_per_worker };
        self.transition(phase, PhaseState::Done);
        outcome
    }
}

fn run_worker(seed: u64, stream: u64, events: &[PreparedEvent], trials: u64) -> PhaseAccumulator {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(stream);

    let mut acc = PhaseAccumulator::new(events.len());
    for _ in 0..trials {
        for (event, slot) in events.iter().zip(acc.results.iter_mut()) {
            event.run_trial(slot, &mut rng);
        }
    }
    acc.trials = trials;
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    fn prepared(lower: f64, upper: f64) -> PreparedEvent {
        PreparedEvent::new(&RiskEvent::new("E", lower, upper, Timeframe::Yearly), 1.0)
    }

    #[test]
    fn new_executor_is_idle_and_finishes_done() {
        let mut exec = TrialExecutor::new(42, Some(2));
        assert_eq!(exec.state(), PhaseState::Idle);
        exec.run_phase(0, &[prepared(0.2, 0.4)], 100);
        assert_eq!(exec.state(), PhaseState::Done);
    }

    #[test]
    fn executed_trials_equal_request_when_divisible() {
        let mut exec = TrialExecutor::new(7, Some(4));
        let out = exec.run_phase(0, &[prepared(0.2, 0.4)], 1_000);
        assert_eq!(out.trials_executed(), 1_000);
        assert_eq!(out.trials_per_worker, 250);
        assert_eq!(out.workers, 4);
    }

    #[test]
    fn remainder_is_truncated_to_multiple_of_workers() {
        let mut exec = TrialExecutor::new(7, Some(4));
        let out = exec.run_phase(0, &[prepared(0.2, 0.4)], 1_003);
        assert_eq!(out.trials_executed(), 1_000, "1_003 over 4 workers must run 4 × 250");
    }

    #[test]
    fn fewer_trials_than_workers_runs_none() {
        let mut exec = TrialExecutor::new(7, Some(8));
        let out = exec.run_phase(0, &[prepared(0.2, 0.4)], 5);
        assert_eq!(out.trials_executed(), 0);
        assert_eq!(out.accumulator.results[0].occurrences, 0);
    }

    #[test]
    fn default_worker_count_follows_thread_pool() {
        let mut exec = TrialExecutor::new(7, None);
        let out = exec.run_phase(0, &[prepared(0.2, 0.4)], 10_000);
        assert_eq!(out.workers, rayon::current_num_threads().max(1));
    }

    #[test]
    fn same_seed_reproduces_identical_sums() {
        let events = vec![
            PreparedEvent::new(
                &RiskEvent::new("A", 0.2, 0.4, Timeframe::Yearly)
                    .with_impact(10_000.0, 50_000.0)
                    .with_confidence(0.8, Some(0.1)),
                1.0,
            ),
            prepared(0.05, 0.1),
        ];
        let run = || TrialExecutor::new(99, Some(3)).run_phase(0, &events, 30_000);
        assert_eq!(run(), run());
    }

    #[test]
    fn different_phases_draw_different_streams() {
        let events = vec![prepared(0.4, 0.6)];
        let mut exec = TrialExecutor::new(99, Some(2));
        let a = exec.run_phase(0, &events, 10_000);
        let b = exec.run_phase(1, &events, 10_000);
        assert_ne!(a.accumulator, b.accumulator, "phase streams must not overlap");
    }

    #[test]
    fn worker_count_does_not_bias_probability() {
        let events = vec![prepared(0.2, 0.4)];
        for workers in [1, 3, 8] {
            let out = TrialExecutor::new(5, Some(workers)).run_phase(0, &events, 240_000);
            let p = out.accumulator.results[0].occurrences as f64 / out.trials_executed() as f64;
            assert!((p - 0.3).abs() < 0.01, "workers={workers}: p={p:.4}");
        }
    }

    #[test]
    fn dependency_factor_scales_probability() {
        let event = RiskEvent::new("B", 0.5, 0.5, Timeframe::Yearly);
        let events = vec![PreparedEvent::new(&event, 0.4)];
        let out = TrialExecutor::new(3, Some(4)).run_phase(1, &events, 200_000);
        let p = out.accumulator.results[0].occurrences as f64 / out.trials_executed() as f64;
        assert!((p - 0.2).abs() < 0.01, "expected ≈ 0.5 × 0.4, got {p:.4}");
    }

    #[test]
    fn long_window_probability_saturates_at_one() {
        let event = RiskEvent::new("Rare", 0.5, 0.5, Timeframe::EveryTenYears);
        let out = TrialExecutor::new(1, Some(2)).run_phase(0, &[PreparedEvent::new(&event, 1.0)], 1_000);
        assert_eq!(out.accumulator.results[0].occurrences, 1_000);
    }

    #[test]
    fn implementation_cost_drawn_every_trial_for_controls() {
        let control = RiskEvent::new("C", 0.1, 0.1, Timeframe::Yearly)
            .with_implementation_cost(15_000.0, 40_000.0)
            .cost_saving();
        let out = TrialExecutor::new(1, Some(2)).run_phase(0, &[PreparedEvent::new(&control, 1.0)], 1_000);
        let r = out.accumulator.results[0];
        assert_eq!(r.cost_lower_min, Some(15_000.0));
        assert_eq!(r.cost_upper_max, Some(40_000.0));
    }

    #[test]
    fn perturbed_cost_extremes_spread_past_the_bounds() {
        let mut control = RiskEvent::new("C", 0.1, 0.1, Timeframe::Yearly)
            .with_implementation_cost(15_000.0, 40_000.0)
            .cost_saving();
        control.cost_of_implementation_lower_std_dev = Some(1_000.0);
        control.cost_of_implementation_upper_std_dev = Some(2_000.0);
        let out = TrialExecutor::new(1, Some(4)).run_phase(0, &[PreparedEvent::new(&control, 1.0)], 4_000);
        let r = out.accumulator.results[0];
        let (lo, hi) = (r.cost_lower_min.unwrap(), r.cost_upper_max.unwrap());
        assert!(lo < 15_000.0 && lo >= 0.0, "min lower draw {lo}");
        assert!(hi > 40_000.0, "max upper draw {hi}");
    }

    #[test]
    fn non_control_skips_implementation_cost() {
        let risk = RiskEvent::new("R", 0.1, 0.1, Timeframe::Yearly).with_implementation_cost(15_000.0, 40_000.0);
        let out = TrialExecutor::new(1, Some(2)).run_phase(0, &[PreparedEvent::new(&risk, 1.0)], 1_000);
        assert_eq!(out.accumulator.results[0].cost_lower_min, None);
    }
}
