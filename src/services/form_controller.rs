use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::card::CardSnapshot;
use crate::models::leaderboard::NewScoreEntry;
use crate::models::period::{Period, Quarter};
use crate::models::settings::Branding;
use crate::models::technician::{
    Badge, Position, StatField, TechnicianStats, DEFAULT_TECHNICIAN_PHOTO,
};
use crate::models::template::{
    PhotoSource, TemplateCreateInput, TemplateDraft, TemplateTechnician, TemplateUpdateInput,
};
use crate::services::roster_service::RosterStore;
use crate::utils::data_uri::file_to_data_uri;

pub const MSG_NAME_REQUIRED: &str = "Technician name is required.";
pub const MSG_INVALID_NUMBER: &str = "Please enter a valid technician number.";
pub const MSG_PHOTO_REQUIRED: &str = "Technician photo is required.";
pub const MSG_PHOTO_UNREADABLE: &str = "Could not process the image file. Please try another one.";
pub const MSG_GENERATION_FAILED: &str = "Failed to generate data. Please try again.";
pub const MSG_LOGO_UNREADABLE: &str = "Could not process the logo file. Please try another one.";

/// Which template, if any, the form was populated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "templateId")]
pub enum Selection {
    Blank,
    Bound(String),
}

impl Selection {
    pub fn template_id(&self) -> Option<&str> {
        match self {
            Selection::Blank => None,
            Selection::Bound(id) => Some(id),
        }
    }
}

/// State of the add/edit template dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "templateId")]
pub enum ModalState {
    Closed,
    Adding,
    Editing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub stats: TechnicianStats,
    pub photo_url: String,
    pub selection: Selection,
    pub modal: ModalState,
    pub period: Period,
    pub branding: Branding,
    pub is_generating: bool,
    pub error: Option<String>,
}

/// The active card form and its link to the roster.
///
/// Form edits never write through to the bound template; only
/// [`FormController::save_template`] changes the roster. The form never
/// keeps a selection whose template has been removed.
#[derive(Debug, Clone)]
pub struct FormController {
    state: FormState,
    default_branding: Branding,
}

impl FormController {
    pub fn new(period: Period, branding: Branding) -> Self {
        Self {
            state: FormState {
                stats: TechnicianStats::default(),
                photo_url: DEFAULT_TECHNICIAN_PHOTO.to_string(),
                selection: Selection::Blank,
                modal: ModalState::Closed,
                period,
                branding: branding.clone(),
                is_generating: false,
                error: None,
            },
            default_branding: branding,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    /// The template the form is bound to, if it still exists.
    pub fn selected_template<'a>(&self, roster: &'a RosterStore) -> Option<&'a TemplateTechnician> {
        self.state
            .selection
            .template_id()
            .and_then(|id| roster.find_by_id(id))
    }

    /// Branding restored by [`FormController::reset_all`].
    pub fn set_default_branding(&mut self, branding: Branding) {
        self.default_branding = branding;
    }

    /// Copies a template's identity fields into the form. Performance
    /// metrics are kept and badges are cleared.
    pub fn select_template(&mut self, roster: &RosterStore, id: &str) -> AppResult<&FormState> {
        let template = roster.find_by_id(id).ok_or_else(AppError::not_found)?;

        self.copy_template_fields(template);
        self.state.stats.badges.clear();
        self.state.selection = Selection::Bound(template.id.clone());
        debug!(target: "app::form", id = %template.id, "template selected");
        Ok(&self.state)
    }

    pub fn clear_selection(&mut self) -> &FormState {
        self.reset_fields();
        debug!(target: "app::form", "selection cleared");
        &self.state
    }

    pub fn open_add_modal(&mut self) -> &FormState {
        self.state.modal = ModalState::Adding;
        &self.state
    }

    /// Opens the edit dialog for the bound template and returns its current values.
    pub fn open_edit_modal(&mut self, roster: &RosterStore) -> AppResult<TemplateTechnician> {
        let id = self
            .state
            .selection
            .template_id()
            .ok_or_else(|| AppError::validation("Select a technician template to edit."))?;
        let template = roster.find_by_id(id).cloned().ok_or_else(AppError::not_found)?;

        self.state.modal = ModalState::Editing(template.id.clone());
        Ok(template)
    }

    /// Validates the dialog values, creates or updates the template and binds
    /// the form to it.
    pub fn save_template(
        &mut self,
        roster: &mut RosterStore,
        draft: TemplateDraft,
    ) -> AppResult<TemplateTechnician> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation(MSG_NAME_REQUIRED));
        }

        let technician_number = parse_technician_number(&draft.technician_number)?;

        let existing = match draft.id.as_deref() {
            Some(id) => Some(roster.find_by_id(id).cloned().ok_or_else(AppError::not_found)?),
            None => None,
        };
        let photo_url = resolve_photo(draft.photo.as_ref(), existing.as_ref())?;

        let saved = match existing {
            Some(existing) => roster.update(
                &existing.id,
                TemplateUpdateInput {
                    name: Some(name),
                    photo_url: Some(photo_url),
                    technician_number: Some(technician_number),
                    position: Some(draft.position),
                },
            )?,
            None => roster.create(TemplateCreateInput {
                name,
                photo_url,
                technician_number,
                position: draft.position,
            }),
        };

        self.copy_template_fields(&saved);
        self.state.selection = Selection::Bound(saved.id.clone());
        self.state.modal = ModalState::Closed;
        info!(target: "app::form", id = %saved.id, "template saved");
        Ok(saved)
    }

    /// Deletes the bound template after `confirm` approves it, then resets
    /// the form. Returns `false` when the user declines.
    pub fn delete_selected_template(
        &mut self,
        roster: &mut RosterStore,
        confirm: impl FnOnce(&TemplateTechnician) -> bool,
    ) -> AppResult<bool> {
        let id = self
            .state
            .selection
            .template_id()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Select a technician template to delete."))?;

        let Some(template) = roster.find_by_id(&id).cloned() else {
            warn!(target: "app::form", %id, "bound template vanished; resetting form");
            self.reset_fields();
            return Err(AppError::not_found());
        };

        if !confirm(&template) {
            debug!(target: "app::form", %id, "template deletion declined");
            return Ok(false);
        }

        roster.delete(&id);
        self.reset_fields();
        Ok(true)
    }

    /// Closes the dialog and drops a selection whose template no longer exists.
    pub fn close_modal(&mut self, roster: &RosterStore) -> &FormState {
        self.state.modal = ModalState::Closed;
        if let Some(id) = self.state.selection.template_id() {
            if !roster.contains(id) {
                warn!(target: "app::form", %id, "bound template no longer exists; resetting form");
                self.reset_fields();
            }
        }
        &self.state
    }

    pub fn set_stat(&mut self, field: StatField, raw: &str) -> f64 {
        field.apply(&mut self.state.stats, raw)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.state.stats.name = name.into();
    }

    pub fn set_position(&mut self, position: Position) {
        self.state.stats.position = position;
    }

    /// Flips a badge on the live card and reports whether it is now shown.
    pub fn toggle_badge(&mut self, badge: Badge) -> bool {
        let badges = &mut self.state.stats.badges;
        if let Some(index) = badges.iter().position(|existing| *existing == badge) {
            badges.remove(index);
            false
        } else {
            badges.push(badge);
            badges.sort();
            true
        }
    }

    pub fn set_period(&mut self, quarter: Quarter, year: &str) -> AppResult<&Period> {
        self.state.period = Period::new(quarter, year)?;
        Ok(&self.state.period)
    }

    pub fn set_company_name(&mut self, name: impl Into<String>) {
        self.state.branding.company_name = name.into();
    }

    /// Replaces the logo with an image file, converted to a data URI.
    pub fn set_company_logo_from_file(&mut self, path: &Path) -> AppResult<()> {
        match file_to_data_uri(path) {
            Ok(uri) => {
                self.state.branding.company_logo = Some(uri);
                self.state.error = None;
                Ok(())
            }
            Err(err) => {
                self.state.error = Some(MSG_LOGO_UNREADABLE.to_string());
                Err(AppError::validation_with_source(MSG_LOGO_UNREADABLE, err))
            }
        }
    }

    /// Full reset: blank form, first quarter of this year, default branding.
    pub fn reset_all(&mut self) -> &FormState {
        self.reset_fields();
        self.state.period = Period::current_default();
        self.state.branding = self.default_branding.clone();
        self.state.error = None;
        info!(target: "app::form", "form reset");
        &self.state
    }

    /// Marks a generation request as in flight. A second request while one
    /// is pending is rejected.
    pub fn begin_generation(&mut self) -> AppResult<()> {
        if self.state.is_generating {
            return Err(AppError::conflict("data generation is already in progress"));
        }
        self.state.is_generating = true;
        self.state.error = None;
        Ok(())
    }

    /// Drops an in-flight request without touching the card.
    pub fn cancel_generation(&mut self) {
        if self.state.is_generating {
            self.state.is_generating = false;
            debug!(target: "app::form", "data generation abandoned");
        }
    }

    /// Applies the outcome of a generation request. On failure the inline
    /// error is set and the original error is returned.
    pub fn complete_generation(
        &mut self,
        result: AppResult<TechnicianStats>,
    ) -> AppResult<&FormState> {
        self.state.is_generating = false;
        match result {
            Ok(mut stats) => {
                stats.badges.clear();
                self.state.stats = stats;
                self.state.photo_url = DEFAULT_TECHNICIAN_PHOTO.to_string();
                self.state.selection = Selection::Blank;
                self.state.error = None;
                info!(target: "app::form", "generated stats applied");
                Ok(&self.state)
            }
            Err(err) => {
                warn!(target: "app::form", error = %err, "data generation failed");
                self.state.error = Some(MSG_GENERATION_FAILED.to_string());
                Err(err)
            }
        }
    }

    pub fn card_snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            stats: self.state.stats.clone(),
            photo_url: self.state.photo_url.clone(),
            period: self.state.period.clone(),
            branding: self.state.branding.clone(),
        }
    }

    /// The current card as a leaderboard submission.
    pub fn to_score_entry(&self) -> NewScoreEntry {
        NewScoreEntry {
            stats: self.state.stats.clone(),
            photo_url: self.state.photo_url.clone(),
            period: self.state.period.clone(),
        }
    }

    fn copy_template_fields(&mut self, template: &TemplateTechnician) {
        let stats = &mut self.state.stats;
        stats.name = template.name.clone();
        stats.technician_number = template.technician_number as f64;
        stats.position = template.position;
        self.state.photo_url = template.photo_url.clone();
    }

    fn reset_fields(&mut self) {
        self.state.stats = TechnicianStats::default();
        self.state.photo_url = DEFAULT_TECHNICIAN_PHOTO.to_string();
        self.state.selection = Selection::Blank;
    }
}

fn parse_technician_number(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(AppError::validation(MSG_INVALID_NUMBER)),
    }
}

fn resolve_photo(
    photo: Option<&PhotoSource>,
    existing: Option<&TemplateTechnician>,
) -> AppResult<String> {
    match photo {
        Some(PhotoSource::File(path)) => file_to_data_uri(path)
            .map_err(|err| AppError::validation_with_source(MSG_PHOTO_UNREADABLE, err)),
        Some(PhotoSource::Url(url)) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        _ => existing
            .map(|template| template.photo_url.clone())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::validation(MSG_PHOTO_REQUIRED)),
    }
}
