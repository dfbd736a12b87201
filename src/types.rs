use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Observation window a probability estimate was stated over.
///
/// Probabilities are normalised to a per-trial base by [`Timeframe::scale`]:
/// sub-year windows divide the estimate, multi-year windows multiply it. The
/// result is not clamped here, so long windows can exceed 1 until the sampler
/// resolves them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
    #[default]
    Yearly,
    EveryTwoYears,
    EveryFiveYears,
    EveryTenYears,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::Daily,
        Timeframe::Weekly,
        Timeframe::Monthly,
        Timeframe::Yearly,
        Timeframe::EveryTwoYears,
        Timeframe::EveryFiveYears,
        Timeframe::EveryTenYears,
    ];

    /// Scale an averaged probability into this window's per-trial base.
    pub fn scale(self, probability: f64) -> f64 {
        match self {
            Timeframe::Daily => probability / 365.0,
            Timeframe::Weekly => probability / 52.0,
            Timeframe::Monthly => probability / 12.0,
            Timeframe::Yearly => probability,
            Timeframe::EveryTwoYears => probability * 2.0,
            Timeframe::EveryFiveYears => probability * 5.0,
            Timeframe::EveryTenYears => probability * 10.0,
        }
    }

    /// How many windows of this length fit in one year.
    pub fn occurrences_per_year(self) -> f64 {
        match self {
            Timeframe::Daily => 365.0,
            Timeframe::Weekly => 52.0,
            Timeframe::Monthly => 12.0,
            Timeframe::Yearly => 1.0,
            Timeframe::EveryTwoYears => 0.5,
            Timeframe::EveryFiveYears => 0.2,
            Timeframe::EveryTenYears => 0.1,
        }
    }

    /// Human-readable window length, e.g. "1 month".
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Daily => "1 day",
            Timeframe::Weekly => "1 week",
            Timeframe::Monthly => "1 month",
            Timeframe::Yearly => "1 year",
            Timeframe::EveryTwoYears => "2 years",
            Timeframe::EveryFiveYears => "5 years",
            Timeframe::EveryTenYears => "10 years",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::Yearly => "yearly",
            Timeframe::EveryTwoYears => "2 years",
            Timeframe::EveryFiveYears => "5 years",
            Timeframe::EveryTenYears => "10 years",
        }
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Timeframe::Daily),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            "yearly" => Ok(Timeframe::Yearly),
            "2 years" | "every_two_years" => Ok(Timeframe::EveryTwoYears),
            "5 years" | "every_five_years" => Ok(Timeframe::EveryFiveYears),
            "10 years" | "every_ten_years" => Ok(Timeframe::EveryTenYears),
            _ => Err(ValidationError::UnknownTimeframe(s.to_string())),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.keyword().to_string()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Which prerequisite outcome a dependent event is conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Condition {
    Happens,
    NotHappens,
}

impl Condition {
    /// Multiplier applied to a dependent probability given the prerequisite's
    /// finalised probability.
    pub fn factor(self, prerequisite_probability: f64) -> f64 {
        match self {
            Condition::Happens => prerequisite_probability,
            Condition::NotHappens => 1.0 - prerequisite_probability,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Happens => "happens",
            Condition::NotHappens => "not happens",
        }
    }
}

impl FromStr for Condition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happens" => Ok(Condition::Happens),
            "not happens" => Ok(Condition::NotHappens),
            _ => Err(ValidationError::UnknownCondition(s.to_string())),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
