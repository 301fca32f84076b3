use serde::{Deserialize, Serialize};

use crate::models::period::{LeaderboardPeriod, Quarter};

pub const KEY_COMPANY_NAME: &str = "company_name";
pub const KEY_COMPANY_LOGO: &str = "company_logo";
pub const KEY_DEFAULT_QUARTER: &str = "default_quarter";
pub const KEY_DEFAULT_YEAR: &str = "default_year";
pub const KEY_LEADERBOARD_PERIOD: &str = "leaderboard_period";

pub const DEFAULT_COMPANY_NAME: &str = "Direct Improvements";
pub const DEFAULT_COMPANY_LOGO: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iNDAiIGhlaWdodD0iNDAiIHZpZXdCb3g9IjAgMCA0MCA0MCIgZmlsbD0ibm9uZSIgeG1sbnM9Imh0dHA6Ly93d3cudzMub3JnLzIwMDAvc3ZnIj48Y2lyY2xlIGN4PSIyMCIgY3k9IjIwIiByPSIyMCIgZmlsbD0iI0ZBQ0MxNSIvPjx0ZXh0IHg9IjUwJSIgeT0iNTIlIiBkb21pbmFudC1iYXNlbGluZT0ibWlkZGxlIiB0ZXh0LWFuY2hvcj0ibWlkZGxlIiBmb250LWZhbWlseT0iQXJpYWwsIHNhbnMtc2VyaWYiIGZvbnQtc2l6ZT0iMjQiIGZvbnQtd2VpZ2h0PSJib2xkIiBmaWxsPSIjMEYxNzJBIj5EPC90ZXh0Pjwvc3ZnPg==";

/// Company branding and period defaults shown on every card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSettings {
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    pub default_quarter: Quarter,
    pub default_year: String,
    pub leaderboard_period: LeaderboardPeriod,
    pub updated_at: String,
}

/// Branding pair carried by the form and card snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub company_name: String,
    pub company_logo: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            company_logo: Some(DEFAULT_COMPANY_LOGO.to_string()),
        }
    }
}

impl From<&CardSettings> for Branding {
    fn from(settings: &CardSettings) -> Self {
        Self {
            company_name: settings.company_name.clone(),
            company_logo: settings.company_logo.clone(),
        }
    }
}
