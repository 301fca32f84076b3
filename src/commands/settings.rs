use serde::Deserialize;

use crate::models::period::{LeaderboardPeriod, Quarter};
use crate::models::settings::CardSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<CardSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get()).await
}

/// Saves settings. New branding also becomes the form's reset target; the
/// leaderboard label follows the saved period.
pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdatePayload,
) -> CommandResult<CardSettings> {
    let app_state = state.clone();
    let input = payload.into_input();
    let settings = run_blocking(move || app_state.settings().update(input)).await?;

    state.form()?.set_default_branding((&settings).into());
    state
        .leaderboard()?
        .set_period_label(settings.leaderboard_period);
    Ok(settings)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub remove_company_logo: Option<bool>,
    #[serde(default)]
    pub default_quarter: Option<Quarter>,
    #[serde(default)]
    pub default_year: Option<String>,
    #[serde(default)]
    pub leaderboard_period: Option<LeaderboardPeriod>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        let company_logo = if self.remove_company_logo == Some(true) {
            Some(None)
        } else {
            self.company_logo.map(Some)
        };

        SettingsUpdateInput {
            company_name: self.company_name,
            company_logo,
            default_quarter: self.default_quarter,
            default_year: self.default_year,
            leaderboard_period: self.leaderboard_period,
        }
    }
}
