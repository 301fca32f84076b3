use std::path::Path;

use crate::models::period::{Period, Quarter};
use crate::models::technician::{Badge, Position, StatField};
use crate::services::form_controller::FormState;

use super::{AppState, CommandResult};

pub fn form_get(state: &AppState) -> CommandResult<FormState> {
    let form = state.form()?;
    Ok(form.state().clone())
}

/// Sets one numeric field from raw input and returns the stored value.
pub fn form_set_stat(state: &AppState, field: &str, raw: &str) -> CommandResult<f64> {
    let field: StatField = field.parse()?;
    let mut form = state.form()?;
    Ok(form.set_stat(field, raw))
}

pub fn form_set_name(state: &AppState, name: &str) -> CommandResult<FormState> {
    let mut form = state.form()?;
    form.set_name(name);
    Ok(form.state().clone())
}

pub fn form_set_position(state: &AppState, position: &str) -> CommandResult<FormState> {
    let position: Position = position.parse()?;
    let mut form = state.form()?;
    form.set_position(position);
    Ok(form.state().clone())
}

/// Returns whether the badge is shown after the toggle.
pub fn form_toggle_badge(state: &AppState, badge: &str) -> CommandResult<bool> {
    let badge: Badge = badge.parse()?;
    let mut form = state.form()?;
    Ok(form.toggle_badge(badge))
}

pub fn form_set_period(state: &AppState, quarter: &str, year: &str) -> CommandResult<Period> {
    let quarter: Quarter = quarter.parse()?;
    let mut form = state.form()?;
    Ok(form.set_period(quarter, year)?.clone())
}

pub fn form_set_company_name(state: &AppState, name: &str) -> CommandResult<FormState> {
    let mut form = state.form()?;
    form.set_company_name(name);
    Ok(form.state().clone())
}

pub fn form_set_company_logo(state: &AppState, path: &Path) -> CommandResult<FormState> {
    let mut form = state.form()?;
    form.set_company_logo_from_file(path)?;
    Ok(form.state().clone())
}

pub fn form_reset(state: &AppState) -> CommandResult<FormState> {
    let branding = state.settings().branding()?;
    let mut form = state.form()?;
    form.set_default_branding(branding);
    Ok(form.reset_all().clone())
}

/// Fills the form with generated stats. The form lock is released while
/// the request is in flight; the busy flag rejects overlapping requests.
pub async fn form_generate(state: &AppState) -> CommandResult<FormState> {
    state.form()?.begin_generation()?;
    let mut pending = PendingGeneration { state, armed: true };

    let result = state.generator().generate().await;

    let mut form = state.form()?;
    pending.armed = false;
    Ok(form.complete_generation(result)?.clone())
}

/// Clears the busy flag if `form_generate` is dropped mid-request.
struct PendingGeneration<'a> {
    state: &'a AppState,
    armed: bool,
}

impl Drop for PendingGeneration<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut form) = self.state.form() {
            form.cancel_generation();
        }
    }
}
