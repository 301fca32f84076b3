use serde::{Deserialize, Serialize};

use crate::models::leaderboard::LeaderboardView;
use crate::models::period::Period;
use crate::models::settings::Branding;
use crate::models::technician::TechnicianStats;

/// Everything the card renderer needs for one technician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSnapshot {
    #[serde(flatten)]
    pub stats: TechnicianStats,
    pub photo_url: String,
    #[serde(flatten)]
    pub period: Period,
    #[serde(flatten)]
    pub branding: Branding,
}

/// Everything the leaderboard renderer needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    #[serde(flatten)]
    pub view: LeaderboardView,
    #[serde(flatten)]
    pub period: Period,
    #[serde(flatten)]
    pub branding: Branding,
}
