use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Condition, Timeframe};

/// One risk factor: a probability range over a timeframe, optionally with a
/// financial impact range. Immutable for the duration of a run.
///
/// Every optional field defaults to absent so scenarios only spell out what
/// they know. The name, probability range and timeframe are always required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskEvent {
    pub name: String,
    pub lower_prob: f64,
    pub upper_prob: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_prob_std_dev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_prob_std_dev: Option<f64>,
    #[serde(default)]
    pub confidence: f64,
    /// Uncertainty injected into every sampled probability and impact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_std_dev: Option<f64>,
    /// Required in scenario files; there is no implied window.
    pub timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_impact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_impact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_impact_std_dev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_impact_std_dev: Option<f64>,
    /// The sampled impact is an avoided loss (a control), not an incurred one.
    #[serde(default)]
    pub is_cost_saving: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_of_implementation_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_of_implementation_upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_of_implementation_lower_std_dev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_of_implementation_upper_std_dev: Option<f64>,
}

impl RiskEvent {
    pub fn new(name: impl Into<String>, lower_prob: f64, upper_prob: f64, timeframe: Timeframe) -> Self {
        RiskEvent {
            name: name.into(),
            lower_prob,
            upper_prob,
            timeframe,
            ..Default::default()
        }
    }

    pub fn with_impact(mut self, min: f64, max: f64) -> Self {
        self.min_impact = Some(min);
        self.max_impact = Some(max);
        self
    }

    pub fn with_confidence(mut self, confidence: f64, std_dev: Option<f64>) -> Self {
        self.confidence = confidence;
        self.confidence_std_dev = std_dev;
        self
    }

    pub fn with_implementation_cost(mut self, lower: f64, upper: f64) -> Self {
        self.cost_of_implementation_lower = Some(lower);
        self.cost_of_implementation_upper = Some(upper);
        self
    }

    pub fn cost_saving(mut self) -> Self {
        self.is_cost_saving = true;
        self
    }

    /// Both impact bounds, if the event carries an impact at all.
    pub fn impact_bounds(&self) -> Option<(f64, f64)> {
        self.min_impact.zip(self.max_impact)
    }

    /// Midpoint of the impact range; 0 when the event has no impact.
    pub fn midpoint_impact(&self) -> f64 {
        self.impact_bounds().map_or(0.0, |(min, max)| (min + max) / 2.0)
    }

    /// Check the per-event invariants that do not depend on other events.
    ///
    /// `max_impact < min_impact` is accepted: the sampler draws
    /// between the two values either way.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyEventName);
        }

        for (field, value) in [("lower_prob", self.lower_prob), ("upper_prob", self.upper_prob)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::ProbabilityOutOfRange {
                    event: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        if self.lower_prob > self.upper_prob {
            return Err(ValidationError::InvertedProbabilityRange {
                event: self.name.clone(),
                lower: self.lower_prob,
                upper: self.upper_prob,
            });
        }

        let non_negative = [
            ("lower_prob_std_dev", self.lower_prob_std_dev),
            ("upper_prob_std_dev", self.upper_prob_std_dev),
            ("confidence_std_dev", self.confidence_std_dev),
            ("min_impact", self.min_impact),
            ("max_impact", self.max_impact),
            ("min_impact_std_dev", self.min_impact_std_dev),
            ("max_impact_std_dev", self.max_impact_std_dev),
            ("cost_of_implementation_lower", self.cost_of_implementation_lower),
            ("cost_of_implementation_upper", self.cost_of_implementation_upper),
            ("cost_of_implementation_lower_std_dev", self.cost_of_implementation_lower_std_dev),
            ("cost_of_implementation_upper_std_dev", self.cost_of_implementation_upper_std_dev),
        ];
        for (field, value) in non_negative {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                return Err(ValidationError::NegativeOrNonFinite {
                    event: self.name.clone(),
                    field,
                    value: v,
                });
            }
        }

        if !self.confidence.is_finite() {
            return Err(ValidationError::NegativeOrNonFinite {
                event: self.name.clone(),
                field: "confidence",
                value: self.confidence,
            });
        }

        Ok(())
    }
}

/// Edge from a dependent event to one of its prerequisites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    #[serde(rename = "event")]
    pub event_name: String,
    pub condition: Condition,
}

impl Dependency {
    pub fn happens(event_name: impl Into<String>) -> Self {
        Dependency { event_name: event_name.into(), condition: Condition::Happens }
    }

    pub fn not_happens(event_name: impl Into<String>) -> Self {
        Dependency { event_name: event_name.into(), condition: Condition::NotHappens }
    }
}

/// Dependent event name → its prerequisite edges, combined multiplicatively.
pub type Dependencies = HashMap<String, Vec<Dependency>>;
