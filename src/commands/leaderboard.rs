use crate::models::leaderboard::LeaderboardView;
use crate::models::period::LeaderboardPeriod;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, AppState, CommandResult};

/// Submits the card currently in the form.
pub fn leaderboard_add_current(state: &AppState) -> CommandResult<LeaderboardView> {
    let entry = state.form()?.to_score_entry();
    let mut leaderboard = state.leaderboard()?;
    leaderboard.add(entry)?;
    Ok(leaderboard.view())
}

pub fn leaderboard_remove(state: &AppState, entry_id: &str) -> CommandResult<LeaderboardView> {
    let mut leaderboard = state.leaderboard()?;
    leaderboard.remove(entry_id);
    Ok(leaderboard.view())
}

pub fn leaderboard_view(state: &AppState) -> CommandResult<LeaderboardView> {
    let leaderboard = state.leaderboard()?;
    Ok(leaderboard.view())
}

/// Changes the period label and remembers it for the next session.
pub async fn leaderboard_set_period(
    state: &AppState,
    label: &str,
) -> CommandResult<LeaderboardView> {
    let period: LeaderboardPeriod = label.parse()?;

    let settings = state.settings();
    run_blocking(move || {
        settings.update(SettingsUpdateInput {
            leaderboard_period: Some(period),
            ..SettingsUpdateInput::default()
        })
    })
    .await?;

    let mut leaderboard = state.leaderboard()?;
    leaderboard.set_period_label(period);
    Ok(leaderboard.view())
}
