use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Last year offered by the year picker.
pub const LAST_SELECTABLE_YEAR: i32 = 2050;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quarter {
    #[default]
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quarter {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|quarter| quarter.label() == wanted)
            .ok_or_else(|| AppError::validation("Quarter must be one of Q1, Q2, Q3, Q4"))
    }
}

/// Quarter plus year tag printed on cards and the leaderboard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub quarter: Quarter,
    pub year: String,
}

impl Period {
    pub fn new(quarter: Quarter, year: impl AsRef<str>) -> AppResult<Self> {
        Ok(Self {
            quarter,
            year: normalize_year(year.as_ref())?,
        })
    }

    /// First quarter of the current calendar year.
    pub fn current_default() -> Self {
        Self {
            quarter: Quarter::Q1,
            year: current_year().to_string(),
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::current_default()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quarter, self.year)
    }
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Years offered by the picker: this year through [`LAST_SELECTABLE_YEAR`].
pub fn year_options(from_year: i32) -> Vec<String> {
    (from_year..=LAST_SELECTABLE_YEAR)
        .map(|year| year.to_string())
        .collect()
}

pub fn normalize_year(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(AppError::validation("Year must be a four digit number"));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeaderboardPeriod {
    Weekly,
    Monthly,
    #[default]
    Quarterly,
}

impl LeaderboardPeriod {
    pub const ALL: [LeaderboardPeriod; 3] = [
        LeaderboardPeriod::Weekly,
        LeaderboardPeriod::Monthly,
        LeaderboardPeriod::Quarterly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LeaderboardPeriod::Weekly => "Weekly",
            LeaderboardPeriod::Monthly => "Monthly",
            LeaderboardPeriod::Quarterly => "Quarterly",
        }
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|period| period.label().to_lowercase() == wanted)
            .ok_or_else(|| {
                AppError::validation("Leaderboard period must be Weekly, Monthly or Quarterly")
            })
    }
}
