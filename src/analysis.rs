use std::collections::{BTreeMap, HashMap};
use std::f64::consts::SQRT_2;

use serde::Serialize;
use statrs::function::erf::erf;

use crate::accumulator::EventResult;
use crate::events::{Dependency, RiskEvent};
use crate::types::Condition;

/// Finalised per-event figures for one phase. Read-only once produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EventStat {
    pub probability: f64,
    pub std_dev: f64,
    /// Smallest sampled lower implementation cost (cost-saving events with
    /// cost bounds only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cost_of_implementation: Option<f64>,
    /// Largest sampled upper implementation cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_of_implementation: Option<f64>,
}

impl EventStat {
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }
}

/// Mean and standard deviation of the impact, over occurred trials only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImpactStat {
    pub mean: f64,
    pub std_dev: f64,
}

/// Occurrence probability and its standard deviation. Zero trials gives zeros.
pub fn mean_std(result: &EventResult, trials: u64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }
    let n = trials as f64;
    let probability = result.occurrences as f64 / n;
    let variance = result.sum_of_squares / n - probability * probability;
    (probability, variance.max(0.0).sqrt())
}

pub fn impact_stat(result: &EventResult) -> ImpactStat {
    if result.occurrences == 0 {
        return ImpactStat::default();
    }
    let n = result.occurrences as f64;
    let mean = result.impact_sum / n;
    let variance = result.impact_sum_of_squares / n - mean * mean;
    ImpactStat { mean, std_dev: variance.max(0.0).sqrt() }
}

pub fn event_stat(event: &RiskEvent, result: &EventResult, trials: u64) -> EventStat {
    let (probability, std_dev) = mean_std(result, trials);
    let has_cost = event.is_cost_saving
        && event.cost_of_implementation_lower.is_some()
        && event.cost_of_implementation_upper.is_some();
    EventStat {
        probability,
        std_dev,
        min_cost_of_implementation: result.cost_lower_min.filter(|_| has_cost),
        max_cost_of_implementation: result.cost_upper_max.filter(|_| has_cost),
    }
}

/// `Φ(x; mean, std_dev)` via the error function.
pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (std_dev * SQRT_2)))
}

/// Probability that a normally distributed loss exceeds `threshold`.
///
/// A zero standard deviation collapses to a step at the mean.
pub fn exceedance_probability(threshold: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return match threshold.partial_cmp(&mean) {
            Some(std::cmp::Ordering::Less) => 1.0,
            Some(std::cmp::Ordering::Greater) => 0.0,
            _ => 0.5,
        };
    }
    1.0 - normal_cdf(threshold, mean, std_dev)
}

/// Savings reported for a cost-saving event. All figures are non-negative
/// amounts of avoided loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Savings {
    /// Negated mean impact.
    pub estimated: f64,
    pub std_dev: f64,
    /// Loss avoided on linked risks through `not happens` edges, scaled to the
    /// control's own window.
    pub mitigation: f64,
}

/// Sum over the event's `not happens` edges of
/// `midpoint_impact(prereq) × (1 − P(prereq)) × P(event) × occurrences_per_year`.
pub fn mitigation_savings(
    event: &RiskEvent,
    edges: &[Dependency],
    events: &HashMap<&str, &RiskEvent>,
    stats: &HashMap<String, EventStat>,
) -> f64 {
    let own_probability = stats.get(&event.name).map_or(0.0, |s| s.probability);
    let per_year = event.timeframe.occurrences_per_year();
    edges
        .iter()
        .filter(|edge| edge.condition == Condition::NotHappens)
        .filter_map(|edge| {
            let prereq = events.get(edge.event_name.as_str())?;
            let p = stats.get(&edge.event_name)?.probability;
            Some(prereq.midpoint_impact() * (1.0 - p) * own_probability * per_year)
        })
        .sum()
}

/// Loss range and exceedance probabilities for one incurred-loss event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EventLoss {
    pub min_loss: f64,
    pub max_loss: f64,
    pub avg_loss: f64,
    pub prob_exceed_min: f64,
    pub prob_exceed_max: f64,
    pub prob_exceed_avg: f64,
}

/// Portfolio aggregate over every incurred-loss event with impact bounds.
///
/// `total_variance` sums per-event probability variances as if events were
/// independent, even where dependency edges say otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LossReport {
    pub total_min_loss: f64,
    pub total_max_loss: f64,
    pub total_avg_loss: f64,
    pub total_variance: f64,
    pub prob_exceed_total_min: f64,
    pub prob_exceed_total_max: f64,
    pub breakdown: BTreeMap<String, EventLoss>,
}

/// Expected loss ranges per event and in total.
///
/// Cost-saving events are excluded: their impact is an avoided loss.
pub fn expected_loss_range(events: &[RiskEvent], stats: &HashMap<String, EventStat>) -> LossReport {
    let mut report = LossReport::default();

    for event in events.iter().filter(|e| !e.is_cost_saving) {
        let (Some((min_impact, max_impact)), Some(stat)) = (event.impact_bounds(), stats.get(&event.name))
        else {
            continue;
        };

        let min_loss = min_impact * stat.probability;
        let max_loss = max_impact * stat.probability;
        let avg_loss = (min_loss + max_loss) / 2.0;

        report.total_min_loss += min_loss;
        report.total_max_loss += max_loss;
        report.total_avg_loss += avg_loss;
        report.total_variance += stat.variance();

        report.breakdown.insert(
            event.name.clone(),
            EventLoss {
                min_loss,
                max_loss,
                avg_loss,
                prob_exceed_min: exceedance_probability(min_loss, avg_loss, stat.std_dev),
                prob_exceed_max: exceedance_probability(max_loss, avg_loss, stat.std_dev),
                prob_exceed_avg: exceedance_probability(avg_loss, avg_loss, stat.std_dev),
            },
        );
    }

    let total_std_dev = report.total_variance.sqrt();
    report.prob_exceed_total_min =
        exceedance_probability(report.total_min_loss, report.total_avg_loss, total_std_dev);
    report.prob_exceed_total_max =
        exceedance_probability(report.total_max_loss, report.total_avg_loss, total_std_dev);
    report
}
