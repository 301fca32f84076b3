use std::path::Path;
use std::sync::Arc;

use crate::models::card::LeaderboardSnapshot;
use crate::services::export_service::{ExportService, ExportTarget, ExportedImage};

use super::{AppState, CommandError, CommandResult};

pub fn export_card(state: &AppState, dir: &Path) -> CommandResult<ExportedImage> {
    let service = export_service(state)?;
    let target = ExportTarget::Card(state.form()?.card_snapshot());
    Ok(service.export_to_dir(&target, dir)?)
}

/// Exports the leaderboard tagged with the form's quarter and year.
pub fn export_leaderboard(state: &AppState, dir: &Path) -> CommandResult<ExportedImage> {
    let service = export_service(state)?;
    let view = state.leaderboard()?.view();
    let (period, branding) = {
        let form = state.form()?;
        let current = form.state();
        (current.period.clone(), current.branding.clone())
    };

    let target = ExportTarget::Leaderboard(LeaderboardSnapshot {
        view,
        period,
        branding,
    });
    Ok(service.export_to_dir(&target, dir)?)
}

fn export_service(state: &AppState) -> CommandResult<Arc<ExportService>> {
    state.exports().ok_or_else(|| {
        CommandError::new(
            "EXPORT_UNAVAILABLE",
            "No image renderer is configured for this session",
            None,
        )
    })
}
