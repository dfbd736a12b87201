pub mod accumulator;
pub mod analysis;
pub mod config;
pub mod dependency;
pub mod error;
pub mod events;
pub mod executor;
pub mod sampling;
pub mod simulation;
pub mod types;

pub use config::{Scenario, SimulationConfig};
pub use error::{Error, Result, ValidationError};
pub use events::{Dependencies, Dependency, RiskEvent};
pub use simulation::{EventReport, Simulation, SimulationResult, run_simulation};
pub use types::{Condition, Timeframe};
