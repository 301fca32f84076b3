use serde::{Deserialize, Serialize};

use crate::models::period::{LeaderboardPeriod, Period};
use crate::models::technician::TechnicianStats;

/// One technician's submitted stats on the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: String,
    #[serde(flatten)]
    pub stats: TechnicianStats,
    pub photo_url: String,
    #[serde(flatten)]
    pub period: Period,
}

/// Card contents submitted to the leaderboard; the id is assigned on add.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewScoreEntry {
    #[serde(flatten)]
    pub stats: TechnicianStats,
    pub photo_url: String,
    #[serde(flatten)]
    pub period: Period,
}

/// Column maxima used for badge assignment. Each one is at least zero.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardMaxima {
    pub avg_performance: f64,
    pub impact_points: f64,
    pub five_star_reviews: f64,
    pub memberships_sold: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// 1-based position after sorting by performance.
    pub rank: usize,
    pub is_top: bool,
    pub entry: ScoreEntry,
}

/// Read model for rendering the leaderboard table.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    pub period_label: LeaderboardPeriod,
    pub rows: Vec<RankedEntry>,
    pub updated_at: String,
}
