use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::events::{Dependencies, Dependency, RiskEvent};
use crate::types::Timeframe;

/// Run parameters. Named fields only; build with [`SimulationConfig::new`]
/// and the `with_*` setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Run-level seed; every worker stream is derived from it.
    pub seed: u64,
    /// Trials requested per phase.
    pub trials: u64,
    /// Fixed worker count. `None` follows the rayon thread pool.
    pub workers: Option<usize>,
}

impl SimulationConfig {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(trials: u64) -> Self {
        SimulationConfig { seed: Self::DEFAULT_SEED, trials, workers: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.trials == 0 {
            return Err(ValidationError::ZeroTrials);
        }
        if self.workers == Some(0) {
            return Err(ValidationError::ZeroWorkers);
        }
        Ok(())
    }
}

/// The events to simulate and how they condition on each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub events: Vec<RiskEvent>,
    #[serde(default)]
    pub dependencies: Dependencies,
}

impl Scenario {
    pub fn new(events: Vec<RiskEvent>, dependencies: Dependencies) -> Self {
        Scenario { events, dependencies }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Number of dependency edges across all dependent events.
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    /// Demo security-risk register: one detective control and five incident
    /// types, two of which are conditioned on others.
    pub fn canonical() -> Self {
        // ── Controls ─────────────────────────────────────────────────────────
        let mut host_breach_detected = RiskEvent::new("Host-Level Breach Detected", 0.80, 0.95, Timeframe::Monthly)
            .with_confidence(0.6, Some(0.10))
            .with_impact(5_000.0, 10_000.0)
            .cost_saving();
        host_breach_detected.lower_prob_std_dev = Some(0.10);
        host_breach_detected.upper_prob_std_dev = Some(0.05);
        host_breach_detected.min_impact_std_dev = Some(10_000.0);
        host_breach_detected.max_impact_std_dev = Some(10_000.0);

        // ── Incidents ────────────────────────────────────────────────────────
        // Impacts in USD.
        let events = vec![
            host_breach_detected,
            RiskEvent::new("Ransomware Attack", 0.25, 0.50, Timeframe::Yearly)
                .with_confidence(0.70, None)
                .with_impact(400_000.0, 1_500_000.0),
            RiskEvent::new("Data Breach", 0.10, 0.25, Timeframe::Yearly)
                .with_confidence(0.80, None)
                .with_impact(800_000.0, 2_500_000.0),
            RiskEvent::new("System Compromise", 0.15, 0.35, Timeframe::EveryFiveYears)
                .with_confidence(0.65, None)
                .with_impact(1_000_000.0, 2_000_000.0),
            RiskEvent::new("Insider Threat", 0.05, 0.15, Timeframe::Yearly)
                .with_confidence(0.75, None)
                .with_impact(200_000.0, 1_000_000.0),
            RiskEvent::new("IT System Failure", 0.05, 0.20, Timeframe::EveryTwoYears)
                .with_confidence(0.60, None)
                .with_impact(100_000.0, 500_000.0),
        ];

        let dependencies = Dependencies::from([
            (
                "Ransomware Attack".to_string(),
                vec![
                    Dependency::happens("Data Breach"),
                    Dependency::not_happens("Host-Level Breach Detected"),
                ],
            ),
            (
                "Insider Threat".to_string(),
                vec![Dependency::not_happens("Host-Level Breach Detected")],
            ),
        ]);

        Scenario { events, dependencies }
    }
}
