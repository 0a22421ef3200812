use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::LifestyleError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Other,
}

impl Gender {
    /// Only an exact "male" selects the male mortality table.
    pub fn from_label(label: &str) -> Self {
        if label == "male" {
            Gender::Male
        } else {
            Gender::Other
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub full_name: String,
    pub birth_year: i32,
    pub gender: Gender,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuperStrategy {
    Growth,
    Balanced,
    Conservative,
    Cash,
}

impl SuperStrategy {
    pub const ALL: [SuperStrategy; 4] = [
        SuperStrategy::Growth,
        SuperStrategy::Balanced,
        SuperStrategy::Conservative,
        SuperStrategy::Cash,
    ];

    /// Annual growth multiplier applied to the balance.
    pub fn growth_factor(self) -> f64 {
        match self {
            SuperStrategy::Growth => 1.045,
            SuperStrategy::Balanced => 1.035,
            SuperStrategy::Conservative => 1.025,
            SuperStrategy::Cash => 1.01,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SuperStrategy::Growth => "growth",
            SuperStrategy::Balanced => "balanced",
            SuperStrategy::Conservative => "conservative",
            SuperStrategy::Cash => "cash",
        }
    }
}

impl FromStr for SuperStrategy {
    type Err = LifestyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "growth" => Ok(SuperStrategy::Growth),
            "balanced" => Ok(SuperStrategy::Balanced),
            "conservative" => Ok(SuperStrategy::Conservative),
            "cash" => Ok(SuperStrategy::Cash),
            _ => Err(LifestyleError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for SuperStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Working years joined with the two independently sourced strategy settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StrategyTriple {
    pub working_years: i32,
    pub strategy_name: String,
    pub contribution_percent: i32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Poverty,
    Modest,
    Comfortable,
}

impl Tier {
    pub fn message(self) -> &'static str {
        match self {
            Tier::Poverty => "Miserable poverty...",
            Tier::Modest => "A modest lifestyle...",
            Tier::Comfortable => "Comfortable!...",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Poverty => "poverty",
            Tier::Modest => "modest",
            Tier::Comfortable => "comfortable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleReport {
    pub full_name: String,
    pub working_years: i32,
    pub death_age: i32,
    pub retirement_years: i32,
    pub super_balance: f64,
    pub lifestyle_ratio: f64,
    pub tier: Tier,
}
