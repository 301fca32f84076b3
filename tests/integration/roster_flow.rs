use std::sync::Arc;

use procard_app_lib::db::DbPool;
use procard_app_lib::models::period::{Period, Quarter};
use procard_app_lib::models::settings::Branding;
use procard_app_lib::models::technician::Position;
use procard_app_lib::models::template::{
    PhotoSource, TemplateCreateInput, TemplateDraft, TemplateUpdateInput,
};
use procard_app_lib::services::blob_store::{BlobStore, MemoryBlobStore, SqliteBlobStore};
use procard_app_lib::services::form_controller::{FormController, Selection};
use procard_app_lib::services::roster_service::{RosterStore, ROSTER_STORAGE_KEY};
use tempfile::tempdir;

const PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

fn sqlite_store(dir: &tempfile::TempDir) -> Arc<dyn BlobStore> {
    let pool = DbPool::new(dir.path().join("roster.sqlite")).expect("db pool");
    Arc::new(SqliteBlobStore::new(pool))
}

fn create_input(name: &str, number: i64, position: Position) -> TemplateCreateInput {
    TemplateCreateInput {
        name: name.to_string(),
        photo_url: PHOTO.to_string(),
        technician_number: number,
        position,
    }
}

#[test]
fn roster_survives_reload_from_sqlite() {
    let dir = tempdir().expect("temp dir");

    let (first_id, second_id) = {
        let mut roster = RosterStore::load(sqlite_store(&dir));
        assert!(roster.is_empty());

        let first = roster.create(create_input("Jane Doe", 7, Position::Tier1Lead));
        let second = roster.create(create_input("John Roe", 12, Position::Apprentice));
        roster
            .update(
                &second.id,
                TemplateUpdateInput {
                    position: Some(Position::Tier3Lead),
                    ..TemplateUpdateInput::default()
                },
            )
            .expect("update existing template");
        (first.id, second.id)
    };

    let reloaded = RosterStore::load(sqlite_store(&dir));
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.list()[0].id, first_id);
    assert_eq!(reloaded.list()[1].id, second_id);

    let second = reloaded.find_by_id(&second_id).expect("second template");
    assert_eq!(second.name, "John Roe");
    assert_eq!(second.position, Position::Tier3Lead);
    assert_eq!(second.technician_number, 12);
}

#[test]
fn ids_stay_unique_across_sessions() {
    let dir = tempdir().expect("temp dir");

    let first_id = {
        let mut roster = RosterStore::load(sqlite_store(&dir));
        roster.create(create_input("Jane Doe", 7, Position::Apprentice)).id
    };

    let mut roster = RosterStore::load(sqlite_store(&dir));
    let second_id = roster.create(create_input("John Roe", 8, Position::Apprentice)).id;

    assert_ne!(first_id, second_id);
    let first: i64 = first_id.parse().expect("numeric id");
    let second: i64 = second_id.parse().expect("numeric id");
    assert!(second > first);
}

#[test]
fn delete_is_persisted() {
    let dir = tempdir().expect("temp dir");

    {
        let mut roster = RosterStore::load(sqlite_store(&dir));
        let kept = roster.create(create_input("Keep Me", 1, Position::Apprentice));
        let dropped = roster.create(create_input("Drop Me", 2, Position::Apprentice));
        assert!(roster.delete(&dropped.id));
        assert!(!roster.delete(&dropped.id));
        assert!(roster.contains(&kept.id));
    }

    let roster = RosterStore::load(sqlite_store(&dir));
    assert_eq!(roster.len(), 1);
    assert_eq!(roster.list()[0].name, "Keep Me");
}

#[test]
fn legacy_snapshot_loads_with_defaults() {
    let legacy = r#"[
        {"id": "1700000000000", "name": "Old Timer", "photoUrl": "https://example.com/a.png", "technicianNumber": "5"},
        {"id": 1700000000001, "name": "Numeric Id", "photoUrl": "", "technicianNumber": 0, "position": "Tier 5 Veteran Lead"},
        {"name": "No Id"},
        "not an object"
    ]"#;
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::with_entry(ROSTER_STORAGE_KEY, legacy));

    let roster = RosterStore::load(store);

    assert_eq!(roster.len(), 2);
    let old = roster.find_by_id("1700000000000").expect("string id");
    assert_eq!(old.position, Position::Apprentice);
    assert_eq!(old.technician_number, 5);

    let numeric = roster.find_by_id("1700000000001").expect("numeric id");
    assert_eq!(numeric.position, Position::Tier5VeteranLead);
    assert_eq!(numeric.technician_number, 0);
}

#[test]
fn corrupt_snapshot_starts_empty() {
    let store: Arc<dyn BlobStore> =
        Arc::new(MemoryBlobStore::with_entry(ROSTER_STORAGE_KEY, "{not json"));
    let roster = RosterStore::load(store);
    assert!(roster.is_empty());
}

#[test]
fn form_edits_do_not_write_through_to_template() {
    let dir = tempdir().expect("temp dir");
    let mut roster = RosterStore::load(sqlite_store(&dir));
    let mut form = FormController::new(
        Period::new(Quarter::Q3, "2025").expect("period"),
        Branding::default(),
    );

    form.open_add_modal();
    let saved = form
        .save_template(
            &mut roster,
            TemplateDraft {
                id: None,
                name: "  Jane Doe  ".to_string(),
                technician_number: "21".to_string(),
                position: Position::Tier2Lead,
                photo: Some(PhotoSource::Url(PHOTO.to_string())),
            },
        )
        .expect("template saved");

    assert_eq!(saved.name, "Jane Doe");
    assert_eq!(form.selection(), &Selection::Bound(saved.id.clone()));

    form.set_name("Someone Else");
    assert_eq!(roster.find_by_id(&saved.id).expect("template").name, "Jane Doe");

    let reloaded = RosterStore::load(sqlite_store(&dir));
    assert_eq!(reloaded.find_by_id(&saved.id).expect("template").name, "Jane Doe");
}

#[test]
fn deleting_bound_template_clears_form() {
    let dir = tempdir().expect("temp dir");
    let mut roster = RosterStore::load(sqlite_store(&dir));
    let template = roster.create(create_input("Jane Doe", 7, Position::Tier1Lead));

    let mut form = FormController::new(Period::default(), Branding::default());
    form.select_template(&roster, &template.id).expect("select");
    assert_eq!(form.state().stats.name, "Jane Doe");

    let declined = form
        .delete_selected_template(&mut roster, |_| false)
        .expect("declined delete");
    assert!(!declined);
    assert!(roster.contains(&template.id));

    let deleted = form
        .delete_selected_template(&mut roster, |candidate| candidate.name == "Jane Doe")
        .expect("confirmed delete");
    assert!(deleted);
    assert!(roster.is_empty());
    assert_eq!(form.selection(), &Selection::Blank);
    assert!(form.state().stats.name.is_empty());
}
