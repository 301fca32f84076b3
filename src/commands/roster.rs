use tracing::debug;

use crate::models::template::{TemplateDraft, TemplateTechnician};
use crate::services::form_controller::FormState;

use super::{AppState, CommandResult};

pub fn roster_list(state: &AppState) -> CommandResult<Vec<TemplateTechnician>> {
    let roster = state.roster()?;
    Ok(roster.list().to_vec())
}

pub fn template_select(state: &AppState, id: &str) -> CommandResult<FormState> {
    let roster = state.roster()?;
    let mut form = state.form()?;
    Ok(form.select_template(&roster, id)?.clone())
}

pub fn template_clear(state: &AppState) -> CommandResult<FormState> {
    let mut form = state.form()?;
    Ok(form.clear_selection().clone())
}

/// The template the form is currently bound to.
pub fn template_selected(state: &AppState) -> CommandResult<Option<TemplateTechnician>> {
    let roster = state.roster()?;
    let form = state.form()?;
    Ok(form.selected_template(&roster).cloned())
}

pub fn template_open_add(state: &AppState) -> CommandResult<FormState> {
    let mut form = state.form()?;
    Ok(form.open_add_modal().clone())
}

/// Opens the edit dialog and returns the values to pre-fill it with.
pub fn template_open_edit(state: &AppState) -> CommandResult<TemplateTechnician> {
    let roster = state.roster()?;
    let mut form = state.form()?;
    Ok(form.open_edit_modal(&roster)?)
}

pub fn template_save(state: &AppState, draft: TemplateDraft) -> CommandResult<TemplateTechnician> {
    let mut roster = state.roster()?;
    let mut form = state.form()?;
    Ok(form.save_template(&mut roster, draft)?)
}

/// Deletes the bound template. The caller asks the user first and passes
/// the answer as `confirmed`.
pub fn template_delete(state: &AppState, confirmed: bool) -> CommandResult<bool> {
    let mut roster = state.roster()?;
    let mut form = state.form()?;
    let deleted = form.delete_selected_template(&mut roster, |template| {
        debug!(target: "app::command", id = %template.id, confirmed, "delete confirmation");
        confirmed
    })?;
    Ok(deleted)
}

pub fn template_close_modal(state: &AppState) -> CommandResult<FormState> {
    let roster = state.roster()?;
    let mut form = state.form()?;
    Ok(form.close_modal(&roster).clone())
}
