use std::cmp::Ordering;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::leaderboard::{
    LeaderboardMaxima, LeaderboardView, NewScoreEntry, RankedEntry, ScoreEntry,
};
use crate::models::period::LeaderboardPeriod;
use crate::models::technician::{Badge, TechnicianStats};

/// Leaderboard entries plus the time of the last membership change.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardState {
    pub entries: Vec<ScoreEntry>,
    pub updated_at: String,
}

impl Default for LeaderboardState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Owns the submitted score entries. Badges are recomputed for the whole
/// set after every add or remove.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardEngine {
    state: LeaderboardState,
    period_label: LeaderboardPeriod,
}

impl LeaderboardEngine {
    pub fn new(period_label: LeaderboardPeriod) -> Self {
        Self {
            state: LeaderboardState::default(),
            period_label,
        }
    }

    pub fn state(&self) -> &LeaderboardState {
        &self.state
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.state.entries
    }

    pub fn period_label(&self) -> LeaderboardPeriod {
        self.period_label
    }

    pub fn set_period_label(&mut self, period_label: LeaderboardPeriod) {
        self.period_label = period_label;
    }

    pub fn add(&mut self, entry: NewScoreEntry) -> AppResult<&LeaderboardState> {
        let name = entry.stats.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name required"));
        }

        let mut stats = entry.stats;
        stats.name = name;
        let entry = ScoreEntry {
            id: Uuid::new_v4().to_string(),
            stats,
            photo_url: entry.photo_url,
            period: entry.period,
        };
        info!(
            target: "app::leaderboard",
            id = %entry.id,
            name = %entry.stats.name,
            "entry added"
        );

        let mut entries = std::mem::take(&mut self.state.entries);
        entries.push(entry);
        self.replace_entries(entries);
        Ok(&self.state)
    }

    /// Removes an entry by id. Unknown ids leave the board as it was, apart
    /// from the refreshed timestamp.
    pub fn remove(&mut self, entry_id: &str) -> &LeaderboardState {
        let mut entries = std::mem::take(&mut self.state.entries);
        let before = entries.len();
        entries.retain(|entry| entry.id != entry_id);
        if entries.len() == before {
            debug!(target: "app::leaderboard", id = entry_id, "remove ignored; entry not found");
        } else {
            info!(target: "app::leaderboard", id = entry_id, "entry removed");
        }

        self.replace_entries(entries);
        &self.state
    }

    pub fn view(&self) -> LeaderboardView {
        LeaderboardView {
            period_label: self.period_label,
            rows: rank_entries(&self.state.entries),
            updated_at: self.state.updated_at.clone(),
        }
    }

    fn replace_entries(&mut self, entries: Vec<ScoreEntry>) {
        self.state.entries = recompute_badges(entries);
        self.state.updated_at = Utc::now().to_rfc3339();
    }
}

/// Per-column maxima across all entries. Each starts at zero and `NaN`
/// values are ignored.
pub fn compute_maxima(entries: &[ScoreEntry]) -> LeaderboardMaxima {
    fn column(entries: &[ScoreEntry], pick: impl Fn(&TechnicianStats) -> f64) -> f64 {
        entries
            .iter()
            .map(|entry| pick(&entry.stats))
            .filter(|value| !value.is_nan())
            .fold(0.0, f64::max)
    }

    LeaderboardMaxima {
        avg_performance: column(entries, |stats| stats.avg_performance),
        impact_points: column(entries, |stats| stats.impact_points),
        five_star_reviews: column(entries, |stats| stats.five_star_reviews),
        memberships_sold: column(entries, |stats| stats.memberships_sold),
    }
}

/// Badges earned by one entry against the given maxima, in canonical order.
pub fn badges_for(stats: &TechnicianStats, maxima: &LeaderboardMaxima) -> Vec<Badge> {
    let is_top = |value: f64, max: f64| max > 0.0 && value == max;

    let top_performance = is_top(stats.avg_performance, maxima.avg_performance);
    let top_impact = is_top(stats.impact_points, maxima.impact_points);
    let top_reviews = is_top(stats.five_star_reviews, maxima.five_star_reviews);
    let top_memberships = is_top(stats.memberships_sold, maxima.memberships_sold);

    let mut badges = Vec::new();
    if top_performance && top_impact {
        badges.push(Badge::Mvp);
    }
    if top_performance {
        badges.push(Badge::Ironman);
    }
    if top_impact {
        badges.push(Badge::Playmaker);
    }
    if top_reviews {
        badges.push(Badge::FanFavorite);
    }
    if top_memberships {
        badges.push(Badge::ClubCaptain);
    }
    badges
}

/// Replaces every entry's badges with the set derived from the whole board.
/// Ties are not broken.
pub fn recompute_badges(mut entries: Vec<ScoreEntry>) -> Vec<ScoreEntry> {
    let maxima = compute_maxima(&entries);
    for entry in &mut entries {
        entry.stats.badges = badges_for(&entry.stats, &maxima);
    }
    entries
}

/// Descending by average performance. Equal values keep their relative
/// order and `NaN` sorts last.
pub fn sorted_by_performance(entries: &[ScoreEntry]) -> Vec<ScoreEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| compare_performance(&a.stats, &b.stats));
    sorted
}

fn compare_performance(a: &TechnicianStats, b: &TechnicianStats) -> Ordering {
    let key = |value: f64| {
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    };
    key(b.avg_performance)
        .partial_cmp(&key(a.avg_performance))
        .unwrap_or(Ordering::Equal)
}

/// Sorted rows with 1-based ranks. Rank 1 is flagged as the top row.
pub fn rank_entries(entries: &[ScoreEntry]) -> Vec<RankedEntry> {
    sorted_by_performance(entries)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| RankedEntry {
            rank: index + 1,
            is_top: index == 0,
            entry,
        })
        .collect()
}
