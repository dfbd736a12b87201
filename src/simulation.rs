use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::accumulator::{EventResult, EventResults, merge_results};
use crate::analysis::{
    self, EventStat, ImpactStat, LossReport, Savings, event_stat, impact_stat, mitigation_savings,
};
use crate::config::{Scenario, SimulationConfig};
use crate::dependency::{self, conditional_factor};
use crate::error::Result;
use crate::events::{Dependencies, RiskEvent};
use crate::executor::{PreparedEvent, TrialExecutor};
use crate::types::Timeframe;

/// Everything reported for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReport {
    pub name: String,
    pub timeframe: Timeframe,
    pub result: EventResult,
    pub stat: EventStat,
    pub impact: ImpactStat,
    /// Present for cost-saving events only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings: Option<Savings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub seed: u64,
    pub requested_trials: u64,
    /// Trials each phase actually ran: `requested_trials` truncated to a
    /// multiple of `workers`.
    pub executed_trials: u64,
    pub workers: usize,
    pub phases: usize,
    /// One report per input event, in input order.
    pub events: Vec<EventReport>,
    pub loss: LossReport,
}

impl SimulationResult {
    pub fn event(&self, name: &str) -> Option<&EventReport> {
        self.events.iter().find(|r| r.name == name)
    }

    pub fn stats(&self) -> HashMap<String, EventStat> {
        self.events.iter().map(|r| (r.name.clone(), r.stat)).collect()
    }

    pub fn results(&self) -> EventResults {
        self.events.iter().map(|r| (r.name.clone(), r.result)).collect()
    }

    /// True when integer division across workers dropped some trials. A run
    /// with no phases dropped nothing.
    pub fn truncated(&self) -> bool {
        self.phases > 0 && self.executed_trials != self.requested_trials
    }
}

pub struct Simulation {
    config: SimulationConfig,
    scenario: Scenario,
}

impl Simulation {
    pub fn new(config: SimulationConfig, scenario: Scenario) -> Self {
        Simulation { config, scenario }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Validate, then run every dependency layer as its own phase.
    ///
    /// A layer's probabilities are finalised before the next layer starts, so
    /// every conditional factor is computed from simulated, not base,
    /// prerequisite probabilities.
    pub fn run(&self) -> Result<SimulationResult> {
        let config = &self.config;
        let events = &self.scenario.events;
        let dependencies = &self.scenario.dependencies;

        config.validate()?;
        dependency::validate(events, dependencies)?;
        let layers = dependency::layers(events, dependencies)?;

        let (independent, dependent) = dependency::partition(events, dependencies);
        info!(
            events = events.len(),
            independent = independent.len(),
            dependent = dependent.len(),
            phases = layers.len(),
            trials = config.trials,
            seed = config.seed,
            "starting simulation"
        );
        if events.is_empty() {
            warn!("scenario has no events");
        }

        let mut executor = TrialExecutor::new(config.seed, config.workers);
        let mut results = EventResults::with_capacity(events.len());
        let mut stats: HashMap<String, EventStat> = HashMap::with_capacity(events.len());
        let mut executed_trials = 0;
        let mut workers = 0;

        for (phase, layer) in layers.iter().enumerate() {
            let prepared: Vec<PreparedEvent> = layer
                .iter()
                .map(|&i| {
                    let event = &events[i];
                    let factor = dependencies
                        .get(&event.name)
                        .map_or(1.0, |edges| conditional_factor(edges, &stats));
                    PreparedEvent::new(event, factor)
                })
                .collect();

            let outcome = executor.run_phase(phase as u32, &prepared, config.trials);
            let trials = outcome.trials_executed();

            for (&i, result) in layer.iter().zip(&outcome.accumulator.results) {
                let event = &events[i];
                stats.insert(event.name.clone(), event_stat(event, result, trials));
            }
            info!(phase, events = layer.len(), trials, workers = outcome.workers, "phase finalised");

            executed_trials = trials;
            workers = outcome.workers;
            let names = layer.iter().map(|&i| events[i].name.as_str());
            merge_results(&mut results, outcome.accumulator.into_named(names));
        }

        let by_name: HashMap<&str, &RiskEvent> = events.iter().map(|e| (e.name.as_str(), e)).collect();
        let reports: Vec<EventReport> = events
            .iter()
            .map(|event| {
                let result = results.get(&event.name).copied().unwrap_or_default();
                let stat = stats.get(&event.name).copied().unwrap_or_default();
                let impact = impact_stat(&result);
                let savings = event.is_cost_saving.then(|| {
                    let edges = dependencies.get(&event.name).map_or(&[][..], Vec::as_slice);
                    Savings {
                        estimated: -impact.mean,
                        std_dev: impact.std_dev,
                        mitigation: mitigation_savings(event, edges, &by_name, &stats),
                    }
                });
                EventReport { name: event.name.clone(), timeframe: event.timeframe, result, stat, impact, savings }
            })
            .collect();

        let loss = analysis::expected_loss_range(events, &stats);
        info!(
            total_avg_loss = loss.total_avg_loss,
            total_min_loss = loss.total_min_loss,
            total_max_loss = loss.total_max_loss,
            executed_trials,
            "simulation complete"
        );

        Ok(SimulationResult {
            seed: config.seed,
            requested_trials: config.trials,
            executed_trials,
            workers,
            phases: layers.len(),
            events: reports,
            loss,
        })
    }
}

/// Run `events` for `trials` trials per phase with the default seed and a
/// worker pool sized to the machine.
pub fn run_simulation(events: &[RiskEvent], trials: u64, dependencies: &Dependencies) -> Result<SimulationResult> {
    let scenario = Scenario::new(events.to_vec(), dependencies.clone());
    Simulation::new(SimulationConfig::new(trials), scenario).run()
}
