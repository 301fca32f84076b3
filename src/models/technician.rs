use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Photo shown on a blank card before a technician is chosen.
pub const DEFAULT_TECHNICIAN_PHOTO: &str =
    "https://storage.googleapis.com/generative-ai-pro-isv-creativetool/83134ca4-6654-4649-bff3-a00d81b21235.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    #[serde(rename = "Apprentice")]
    Apprentice,
    #[serde(rename = "Tier 1 Lead")]
    Tier1Lead,
    #[serde(rename = "Tier 2 Lead")]
    Tier2Lead,
    #[serde(rename = "Tier 3 Lead")]
    Tier3Lead,
    #[serde(rename = "Tier 4 Senior Lead")]
    Tier4SeniorLead,
    #[serde(rename = "Tier 5 Veteran Lead")]
    Tier5VeteranLead,
}

impl Position {
    /// Selectable positions in display order. The first entry is the default.
    pub const ALL: [Position; 6] = [
        Position::Apprentice,
        Position::Tier1Lead,
        Position::Tier2Lead,
        Position::Tier3Lead,
        Position::Tier4SeniorLead,
        Position::Tier5VeteranLead,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Position::Apprentice => "Apprentice",
            Position::Tier1Lead => "Tier 1 Lead",
            Position::Tier2Lead => "Tier 2 Lead",
            Position::Tier3Lead => "Tier 3 Lead",
            Position::Tier4SeniorLead => "Tier 4 Senior Lead",
            Position::Tier5VeteranLead => "Tier 5 Veteran Lead",
        }
    }

    /// Case- and whitespace-insensitive lookup by display label.
    pub fn from_label(value: &str) -> Option<Self> {
        let normalized = normalize_label(value);
        Self::ALL
            .into_iter()
            .find(|position| normalize_label(position.label()) == normalized)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Position {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_label(value).ok_or_else(|| {
            AppError::validation(format!(
                "Unknown position '{}'. Expected one of: {}",
                value.trim(),
                Self::ALL.map(Position::label).join(", ")
            ))
        })
    }
}

fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "MVP")]
    Mvp,
    #[serde(rename = "Ironman")]
    Ironman,
    #[serde(rename = "Playmaker")]
    Playmaker,
    #[serde(rename = "Fan Favorite")]
    FanFavorite,
    #[serde(rename = "Club Captain")]
    ClubCaptain,
}

impl Badge {
    /// Canonical vocabulary, in assignment order.
    pub const ALL: [Badge; 5] = [
        Badge::Mvp,
        Badge::Ironman,
        Badge::Playmaker,
        Badge::FanFavorite,
        Badge::ClubCaptain,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Badge::Mvp => "MVP",
            Badge::Ironman => "Ironman",
            Badge::Playmaker => "Playmaker",
            Badge::FanFavorite => "Fan Favorite",
            Badge::ClubCaptain => "Club Captain",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Badge::Mvp => "🏆",
            Badge::Ironman => "💪",
            Badge::Playmaker => "✨",
            Badge::FanFavorite => "⭐",
            Badge::ClubCaptain => "🎟",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Badge {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_label(value);
        Self::ALL
            .into_iter()
            .find(|badge| normalize_label(badge.label()) == normalized)
            .ok_or_else(|| AppError::validation(format!("Unknown badge '{}'", value.trim())))
    }
}

/// Editable stats behind a pro card.
///
/// Numbers are `f64` because form input is coerced rather than validated:
/// a non-numeric entry becomes `NaN` and negative values pass through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianStats {
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub technician_number: f64,
    #[serde(default)]
    pub avg_performance: f64,
    #[serde(default)]
    pub ticket_value: f64,
    #[serde(default)]
    pub impact_points: f64,
    #[serde(default)]
    pub five_star_reviews: f64,
    #[serde(default)]
    pub memberships_sold: f64,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl Default for TechnicianStats {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Position::default(),
            technician_number: 0.0,
            avg_performance: 0.0,
            ticket_value: 0.0,
            impact_points: 0.0,
            five_star_reviews: 0.0,
            memberships_sold: 0.0,
            badges: Vec::new(),
        }
    }
}

impl TechnicianStats {
    /// The card shows the number only when it is a positive value.
    pub fn display_number(&self) -> Option<i64> {
        if self.technician_number > 0.0 {
            Some(self.technician_number.trunc() as i64)
        } else {
            None
        }
    }
}

/// Numeric inputs on the card form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    AvgPerformance,
    TicketValue,
    ImpactPoints,
    FiveStarReviews,
    MembershipsSold,
    TechnicianNumber,
}

impl StatField {
    pub const ALL: [StatField; 6] = [
        StatField::AvgPerformance,
        StatField::TicketValue,
        StatField::ImpactPoints,
        StatField::FiveStarReviews,
        StatField::MembershipsSold,
        StatField::TechnicianNumber,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatField::AvgPerformance => "avgPerformance",
            StatField::TicketValue => "ticketValue",
            StatField::ImpactPoints => "impactPoints",
            StatField::FiveStarReviews => "fiveStarReviews",
            StatField::MembershipsSold => "membershipsSold",
            StatField::TechnicianNumber => "technicianNumber",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatField::AvgPerformance => "Avg. Performance %",
            StatField::TicketValue => "Avg. Job Ticket Value ($)",
            StatField::ImpactPoints => "Avg. Impact Points",
            StatField::FiveStarReviews => "5-Star Reviews",
            StatField::MembershipsSold => "Memberships Sold",
            StatField::TechnicianNumber => "Tech #",
        }
    }

    pub fn get(self, stats: &TechnicianStats) -> f64 {
        match self {
            StatField::AvgPerformance => stats.avg_performance,
            StatField::TicketValue => stats.ticket_value,
            StatField::ImpactPoints => stats.impact_points,
            StatField::FiveStarReviews => stats.five_star_reviews,
            StatField::MembershipsSold => stats.memberships_sold,
            StatField::TechnicianNumber => stats.technician_number,
        }
    }

    /// Coerces raw input and writes it. Only the performance percentage is clamped.
    pub fn apply(self, stats: &mut TechnicianStats, raw: &str) -> f64 {
        let value = coerce_number(raw);
        let value = match self {
            StatField::AvgPerformance => clamp_performance(value),
            _ => value,
        };

        let slot = match self {
            StatField::AvgPerformance => &mut stats.avg_performance,
            StatField::TicketValue => &mut stats.ticket_value,
            StatField::ImpactPoints => &mut stats.impact_points,
            StatField::FiveStarReviews => &mut stats.five_star_reviews,
            StatField::MembershipsSold => &mut stats.memberships_sold,
            StatField::TechnicianNumber => &mut stats.technician_number,
        };
        *slot = value;
        value
    }
}

impl FromStr for StatField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().replace(['-', '_'], "").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.key().to_lowercase() == wanted)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown stat field '{}'. Expected one of: {}",
                    value.trim(),
                    Self::ALL.map(StatField::key).join(", ")
                ))
            })
    }
}

/// Loose numeric coercion for form input: blank is zero, garbage is `NaN`.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Snaps values outside [0, 100] to the nearest bound. `NaN` is left as is.
pub fn clamp_performance(value: f64) -> f64 {
    if value > 100.0 {
        100.0
    } else if value < 0.0 {
        0.0
    } else {
        // folds -0.0 into 0.0
        value + 0.0
    }
}
