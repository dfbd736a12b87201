use thiserror::Error;

/// A rejected scenario or run configuration. Always raised before the first
/// trial; a running simulation cannot fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("event name must not be empty")]
    EmptyEventName,

    #[error("duplicate event name: {0}")]
    DuplicateEvent(String),

    #[error("event {event}: {field} must be a finite value in [0, 1], got {value}")]
    ProbabilityOutOfRange { event: String, field: &'static str, value: f64 },

    #[error("event {event}: lower probability {lower} exceeds upper probability {upper}")]
    InvertedProbabilityRange { event: String, lower: f64, upper: f64 },

    #[error("event {event}: {field} must be finite and non-negative, got {value}")]
    NegativeOrNonFinite { event: String, field: &'static str, value: f64 },

    #[error("trial count must be positive")]
    ZeroTrials,

    #[error("worker count must be positive")]
    ZeroWorkers,

    #[error("dependencies declared for unknown event: {0}")]
    UnknownDependent(String),

    #[error("event {dependent} depends on unknown event: {prerequisite}")]
    UnknownPrerequisite { dependent: String, prerequisite: String },

    #[error("event {0} depends on itself")]
    SelfDependency(String),

    #[error("dependency cycle involving: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("unknown dependency condition: {0:?} (expected \"happens\" or \"not happens\")")]
    UnknownCondition(String),

    #[error("unknown timeframe: {0:?}")]
    UnknownTimeframe(String),
}

/// Crate-level error: validation plus the IO around loading scenarios.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
