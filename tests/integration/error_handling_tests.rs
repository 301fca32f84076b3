// Error handling and edge case tests

use std::sync::Arc;

use procard_app_lib::db::DbPool;
use procard_app_lib::error::{AiErrorCode, AppError};
use procard_app_lib::models::period::{Period, Quarter};
use procard_app_lib::models::settings::Branding;
use procard_app_lib::models::technician::{Position, StatField, DEFAULT_TECHNICIAN_PHOTO};
use procard_app_lib::models::template::{PhotoSource, TemplateDraft};
use procard_app_lib::services::blob_store::MemoryBlobStore;
use procard_app_lib::services::form_controller::{
    FormController, ModalState, Selection, MSG_GENERATION_FAILED, MSG_INVALID_NUMBER,
    MSG_LOGO_UNREADABLE, MSG_NAME_REQUIRED, MSG_PHOTO_REQUIRED, MSG_PHOTO_UNREADABLE,
};
use procard_app_lib::services::roster_service::RosterStore;
use procard_app_lib::services::settings_service::{SettingsService, SettingsUpdateInput};
use tempfile::tempdir;

fn setup_form() -> (FormController, RosterStore) {
    let form = FormController::new(
        Period::new(Quarter::Q1, "2025").expect("period"),
        Branding::default(),
    );
    let roster = RosterStore::load(Arc::new(MemoryBlobStore::new()));
    (form, roster)
}

fn draft(name: &str, number: &str, photo: Option<PhotoSource>) -> TemplateDraft {
    TemplateDraft {
        id: None,
        name: name.to_string(),
        technician_number: number.to_string(),
        position: Position::Apprentice,
        photo,
    }
}

fn url(value: &str) -> Option<PhotoSource> {
    Some(PhotoSource::Url(value.to_string()))
}

fn message(error: &AppError) -> String {
    error.to_string()
}

#[test]
fn test_template_validation_messages() {
    let (mut form, mut roster) = setup_form();
    form.open_add_modal();

    let error = form
        .save_template(&mut roster, draft("   ", "5", url("https://example.com/a.png")))
        .expect_err("blank name");
    assert_eq!(message(&error), MSG_NAME_REQUIRED);

    for bad_number in ["", "0", "-3", "abc", "4.5"] {
        let error = form
            .save_template(&mut roster, draft("Jane", bad_number, url("https://example.com/a.png")))
            .expect_err("invalid number");
        assert_eq!(message(&error), MSG_INVALID_NUMBER, "input {bad_number:?}");
    }

    let error = form
        .save_template(&mut roster, draft("Jane", "5", None))
        .expect_err("missing photo");
    assert_eq!(message(&error), MSG_PHOTO_REQUIRED);

    let error = form
        .save_template(&mut roster, draft("Jane", "5", url("   ")))
        .expect_err("blank photo url");
    assert_eq!(message(&error), MSG_PHOTO_REQUIRED);

    assert!(roster.is_empty());
    assert_eq!(form.state().modal, ModalState::Adding);
}

#[test]
fn test_unreadable_photo_file() {
    let dir = tempdir().expect("temp dir");
    let (mut form, mut roster) = setup_form();

    let missing = dir.path().join("missing.png");
    let error = form
        .save_template(&mut roster, draft("Jane", "5", Some(PhotoSource::File(missing))))
        .expect_err("unreadable photo");
    assert_eq!(message(&error), MSG_PHOTO_UNREADABLE);
    assert!(roster.is_empty());
}

#[test]
fn test_photo_file_is_embedded_as_data_uri() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("portrait.png");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\n0000").expect("write png");

    let (mut form, mut roster) = setup_form();
    let saved = form
        .save_template(&mut roster, draft("Jane", "5", Some(PhotoSource::File(path))))
        .expect("saved");
    assert!(saved.photo_url.starts_with("data:image/png;base64,"));
}

#[test]
fn test_edit_keeps_existing_photo() {
    let (mut form, mut roster) = setup_form();
    let saved = form
        .save_template(&mut roster, draft("Jane", "5", url("https://example.com/a.png")))
        .expect("saved");

    let current = form.open_edit_modal(&roster).expect("edit modal");
    assert_eq!(form.state().modal, ModalState::Editing(saved.id.clone()));

    let updated = form
        .save_template(
            &mut roster,
            TemplateDraft {
                id: Some(current.id.clone()),
                name: "Jane Smith".to_string(),
                technician_number: "6".to_string(),
                position: Position::Tier4SeniorLead,
                photo: None,
            },
        )
        .expect("updated");

    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.photo_url, "https://example.com/a.png");
    assert_eq!(roster.len(), 1);
    assert_eq!(form.state().stats.technician_number, 6.0);
}

#[test]
fn test_editing_without_selection_fails() {
    let (mut form, roster) = setup_form();
    let error = form.open_edit_modal(&roster).expect_err("nothing selected");
    assert!(error.is_validation());
}

#[test]
fn test_selecting_unknown_template_leaves_form_untouched() {
    let (mut form, roster) = setup_form();
    form.set_name("Keep");
    let error = form.select_template(&roster, "404").expect_err("unknown id");
    assert!(error.is_not_found());
    assert_eq!(form.state().stats.name, "Keep");
    assert_eq!(form.selection(), &Selection::Blank);
}

#[test]
fn test_non_numeric_stats_become_nan() {
    let (mut form, _roster) = setup_form();
    assert!(form.set_stat(StatField::TicketValue, "lots").is_nan());
    assert_eq!(form.set_stat(StatField::ImpactPoints, "-12"), -12.0);
    assert_eq!(form.set_stat(StatField::AvgPerformance, "-5"), 0.0);
    assert_eq!(form.set_stat(StatField::AvgPerformance, "250"), 100.0);
}

#[test]
fn test_invalid_period_year() {
    let (mut form, _roster) = setup_form();
    assert!(form.set_period(Quarter::Q3, "20x5").is_err());
    assert_eq!(form.state().period, Period::new(Quarter::Q1, "2025").expect("period"));
    assert_eq!(form.set_period(Quarter::Q3, "2026").expect("valid").year, "2026");
}

#[test]
fn test_unreadable_logo_sets_inline_error() {
    let dir = tempdir().expect("temp dir");
    let (mut form, _roster) = setup_form();
    let before = form.state().branding.company_logo.clone();

    let error = form
        .set_company_logo_from_file(&dir.path().join("nope.svg"))
        .expect_err("missing logo");
    assert_eq!(message(&error), MSG_LOGO_UNREADABLE);
    assert_eq!(form.state().error.as_deref(), Some(MSG_LOGO_UNREADABLE));
    assert_eq!(form.state().branding.company_logo, before);
}

#[test]
fn test_generation_failures_and_overlap() {
    let (mut form, _roster) = setup_form();
    form.set_name("Original");

    form.begin_generation().expect("first request");
    let overlap = form.begin_generation().expect_err("second request");
    assert!(matches!(overlap, AppError::Conflict { .. }));

    let error = form
        .complete_generation(Err(AppError::ai(AiErrorCode::HttpTimeout, "timed out")))
        .expect_err("generation failed");
    assert_eq!(error.ai_code(), Some(AiErrorCode::HttpTimeout));
    assert!(!form.state().is_generating);
    assert_eq!(form.state().error.as_deref(), Some(MSG_GENERATION_FAILED));
    assert_eq!(form.state().stats.name, "Original");
    assert_eq!(form.state().photo_url, DEFAULT_TECHNICIAN_PHOTO);
}

#[test]
fn test_settings_validation() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("settings.sqlite")).expect("db pool");
    let service = SettingsService::new(pool).expect("settings service");

    let blank = service.update(SettingsUpdateInput {
        company_name: Some("   ".to_string()),
        ..SettingsUpdateInput::default()
    });
    assert!(blank.expect_err("blank name").is_validation());

    let bad_logo = service.update(SettingsUpdateInput {
        company_logo: Some(Some("file:///etc/passwd".to_string())),
        ..SettingsUpdateInput::default()
    });
    assert!(bad_logo.expect_err("bad logo").is_validation());

    let far_year = service.update(SettingsUpdateInput {
        default_year: Some("2051".to_string()),
        ..SettingsUpdateInput::default()
    });
    assert!(far_year.expect_err("year out of range").is_validation());

    let settings = service.get().expect("settings");
    assert_eq!(settings.company_name, "Direct Improvements");
}
