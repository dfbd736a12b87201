use std::collections::HashMap;

use serde::Serialize;

/// Raw per-event sums over the trials of one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EventResult {
    pub occurrences: u64,
    /// Sum of squared 0/1 outcomes.
    pub sum_of_squares: f64,
    /// Sum of signed impacts over occurred trials (negative for cost-saving events).
    pub impact_sum: f64,
    pub impact_sum_of_squares: f64,
    /// Smallest sampled implementation-cost lower bound; one draw per trial.
    pub cost_lower_min: Option<f64>,
    /// Largest sampled implementation-cost upper bound.
    pub cost_upper_max: Option<f64>,
}

impl EventResult {
    #[inline]
    pub fn record_occurrence(&mut self, impact: f64) {
        self.occurrences += 1;
        self.sum_of_squares += 1.0;
        self.impact_sum += impact;
        self.impact_sum_of_squares += impact * impact;
    }

    #[inline]
    pub fn record_cost(&mut self, lower: f64, upper: f64) {
        self.cost_lower_min = extreme(self.cost_lower_min, Some(lower), f64::min);
        self.cost_upper_max = extreme(self.cost_upper_max, Some(upper), f64::max);
    }

    pub fn merge(&mut self, other: &EventResult) {
        self.occurrences += other.occurrences;
        self.sum_of_squares += other.sum_of_squares;
        self.impact_sum += other.impact_sum;
        self.impact_sum_of_squares += other.impact_sum_of_squares;
        self.cost_lower_min = extreme(self.cost_lower_min, other.cost_lower_min, f64::min);
        self.cost_upper_max = extreme(self.cost_upper_max, other.cost_upper_max, f64::max);
    }
}

fn extreme(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(pick(x, y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// One worker's accumulator: a slot per event in phase order plus the number
/// of trials it ran. Never shared between workers; combined only by
/// [`PhaseAccumulator::merge`], which is associative and commutative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseAccumulator {
    pub trials: u64,
    pub results: Vec<EventResult>,
}

impl PhaseAccumulator {
    pub fn new(n_events: usize) -> Self {
        PhaseAccumulator { trials: 0, results: vec![EventResult::default(); n_events] }
    }

    /// Combine two accumulators for the same event set.
    ///
    /// An empty accumulator (the reduction identity) adopts the other's shape.
    pub fn merge(mut self, other: PhaseAccumulator) -> PhaseAccumulator {
        if self.results.is_empty() {
            self.results = other.results;
        } else {
            debug_assert!(
                other.results.is_empty() || other.results.len() == self.results.len(),
                "merging accumulators for different event sets"
            );
            for (acc, r) in self.results.iter_mut().zip(&other.results) {
                acc.merge(r);
            }
        }
        self.trials += other.trials;
        self
    }

    /// Re-key by event name. `names` must be in the same order the phase ran.
    pub fn into_named<'a>(self, names: impl IntoIterator<Item = &'a str>) -> EventResults {
        names.into_iter().map(str::to_string).zip(self.results).collect()
    }
}

/// Final per-event sums keyed by event name.
pub type EventResults = HashMap<String, EventResult>;

/// Fold `other` into `into`, adding field-wise where a name appears in both.
pub fn merge_results(into: &mut EventResults, other: EventResults) {
    for (name, result) in other {
        into.entry(name).or_default().merge(&result);
    }
}
