use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::technician::Position;
use crate::models::template::{TemplateCreateInput, TemplateTechnician, TemplateUpdateInput};
use crate::services::blob_store::BlobStore;

/// Blob key holding the JSON snapshot of the roster.
pub const ROSTER_STORAGE_KEY: &str = "technicianTemplates";

/// Stored shape of a template. Everything except the id is optional so that
/// snapshots written by older builds still load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTemplate {
    id: JsonValue,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    technician_number: Option<JsonValue>,
    #[serde(default)]
    position: Option<String>,
}

/// Reusable technician templates, in insertion order.
///
/// Every mutation writes the whole roster back to the blob store. Write
/// failures are logged and never undo the in-memory change.
pub struct RosterStore {
    store: Arc<dyn BlobStore>,
    templates: Vec<TemplateTechnician>,
    last_issued_id: i64,
}

impl RosterStore {
    /// Restores the roster from the blob store. Missing or unreadable data
    /// yields an empty roster.
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let templates = match store.get(ROSTER_STORAGE_KEY) {
            Ok(Some(raw)) => decode_snapshot(&raw).unwrap_or_else(|err| {
                warn!(
                    target: "app::roster",
                    error = %err,
                    "stored roster is unreadable; starting with an empty roster"
                );
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(
                    target: "app::roster",
                    error = %err,
                    "failed to read stored roster; starting with an empty roster"
                );
                Vec::new()
            }
        };

        let last_issued_id = templates
            .iter()
            .filter_map(|template| template.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        info!(target: "app::roster", count = templates.len(), "roster loaded");

        Self {
            store,
            templates,
            last_issued_id,
        }
    }

    pub fn list(&self) -> &[TemplateTechnician] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TemplateTechnician> {
        self.templates.iter().find(|template| template.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    pub fn create(&mut self, input: TemplateCreateInput) -> TemplateTechnician {
        let template = TemplateTechnician {
            id: self.next_id(),
            name: input.name,
            photo_url: input.photo_url,
            technician_number: input.technician_number,
            position: input.position,
        };

        self.templates.push(template.clone());
        info!(target: "app::roster", id = %template.id, "template created");
        self.persist();
        template
    }

    /// Replaces the provided fields of an existing template. The id never changes.
    pub fn update(&mut self, id: &str, patch: TemplateUpdateInput) -> AppResult<TemplateTechnician> {
        let template = self
            .templates
            .iter_mut()
            .find(|template| template.id == id)
            .ok_or_else(AppError::not_found)?;

        if let Some(name) = patch.name {
            template.name = name;
        }
        if let Some(photo_url) = patch.photo_url {
            template.photo_url = photo_url;
        }
        if let Some(number) = patch.technician_number {
            template.technician_number = number;
        }
        if let Some(position) = patch.position {
            template.position = position;
        }

        let updated = template.clone();
        info!(target: "app::roster", id = %updated.id, "template updated");
        self.persist();
        Ok(updated)
    }

    /// Removes the template if present and reports whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|template| template.id != id);
        let removed = self.templates.len() != before;

        if removed {
            info!(target: "app::roster", %id, "template deleted");
            self.persist();
        } else {
            debug!(target: "app::roster", %id, "delete ignored; template not found");
        }
        removed
    }

    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        // Restored ids can sit at the top of the range; fall back to the clock
        // and step past any id already taken.
        let mut id = match self.last_issued_id.checked_add(1) {
            Some(next) => now.max(next),
            None => now,
        };
        while self.contains(&id.to_string()) {
            id = id.wrapping_add(1);
        }
        self.last_issued_id = id;
        id.to_string()
    }

    fn persist(&self) {
        let result = encode_snapshot(&self.templates)
            .and_then(|json| self.store.set(ROSTER_STORAGE_KEY, &json));

        if let Err(err) = result {
            warn!(
                target: "app::roster",
                error = %err,
                "failed to persist roster snapshot"
            );
        }
    }
}

pub fn encode_snapshot(templates: &[TemplateTechnician]) -> AppResult<String> {
    Ok(serde_json::to_string(templates)?)
}

/// Parses a stored roster, defaulting fields that older snapshots may lack.
///
/// A document that is not a JSON array is an error. Individual records that
/// cannot be read are skipped with a warning.
pub fn decode_snapshot(raw: &str) -> AppResult<Vec<TemplateTechnician>> {
    let records: Vec<JsonValue> = serde_json::from_str(raw)?;
    let mut templates = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<StoredTemplate>(record) {
            Ok(stored) => match normalize_stored(stored) {
                Some(template) => templates.push(template),
                None => warn!(
                    target: "app::roster",
                    index,
                    "skipping stored template without a usable id"
                ),
            },
            Err(err) => warn!(
                target: "app::roster",
                index,
                error = %err,
                "skipping malformed stored template"
            ),
        }
    }

    Ok(templates)
}

fn normalize_stored(stored: StoredTemplate) -> Option<TemplateTechnician> {
    let id = match stored.id {
        JsonValue::String(value) if !value.trim().is_empty() => value,
        JsonValue::Number(value) => value.to_string(),
        _ => return None,
    };

    let position = match stored.position.as_deref().map(str::trim) {
        None | Some("") => Position::default(),
        Some(label) => Position::from_label(label).unwrap_or_else(|| {
            warn!(
                target: "app::roster",
                %id,
                position = label,
                "unknown stored position; using the default position"
            );
            Position::default()
        }),
    };

    Some(TemplateTechnician {
        technician_number: legacy_number(stored.technician_number.as_ref()),
        name: stored.name.unwrap_or_default(),
        photo_url: stored.photo_url.unwrap_or_default(),
        position,
        id,
    })
}

/// Falsy or unreadable numbers become 0.
fn legacy_number(value: Option<&JsonValue>) -> i64 {
    match value {
        Some(JsonValue::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            .unwrap_or(0),
        Some(JsonValue::String(text)) => text.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::blob_store::MemoryBlobStore;

    struct FailingStore;

    impl BlobStore for FailingStore {
        fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::persistence("disk full"))
        }

        fn remove(&self, _key: &str) -> AppResult<()> {
            Err(AppError::persistence("disk full"))
        }
    }

    fn jane() -> TemplateCreateInput {
        TemplateCreateInput {
            name: "Jane Doe".into(),
            photo_url: "data:image/png;base64,AAAA".into(),
            technician_number: 7,
            position: Position::Apprentice,
        }
    }

    #[test]
    fn create_update_delete_cycle() {
        let store = Arc::new(MemoryBlobStore::new());
        let mut roster = RosterStore::load(store.clone());

        let created = roster.create(jane());
        assert_eq!(roster.len(), 1);

        let updated = roster
            .update(
                &created.id,
                TemplateUpdateInput {
                    position: Some(Position::Tier2Lead),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.position, Position::Tier2Lead);
        assert_eq!(updated.name, "Jane Doe");
        assert_eq!(updated.technician_number, 7);

        assert!(roster.delete(&created.id));
        assert!(roster.is_empty());
        assert_eq!(store.get(ROSTER_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut roster = RosterStore::load(Arc::new(MemoryBlobStore::new()));
        let err = roster
            .update("missing", TemplateUpdateInput::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_unknown_id_is_a_no_op() {
        let mut roster = RosterStore::load(Arc::new(MemoryBlobStore::new()));
        roster.create(jane());
        assert!(!roster.delete("missing"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut roster = RosterStore::load(Arc::new(MemoryBlobStore::new()));
        let ids: Vec<i64> = (0..5)
            .map(|_| roster.create(jane()).id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn roster_round_trips_through_the_store() {
        let store = Arc::new(MemoryBlobStore::new());
        let created = {
            let mut roster = RosterStore::load(store.clone());
            roster.create(jane())
        };

        let reloaded = RosterStore::load(store);
        assert_eq!(reloaded.list(), &[created]);
    }

    #[test]
    fn ids_stay_ahead_of_restored_templates() {
        let raw = r#"[{"id":"99999999999999","name":"Old","photoUrl":"x","technicianNumber":1,"position":"Apprentice"}]"#;
        let store = Arc::new(MemoryBlobStore::with_entry(ROSTER_STORAGE_KEY, raw));
        let mut roster = RosterStore::load(store);
        let created = roster.create(jane());
        assert_eq!(created.id, "100000000000000");
    }

    #[test]
    fn restored_max_id_does_not_overflow() {
        let raw = r#"[{"id":"9223372036854775807","name":"Old","photoUrl":"x","technicianNumber":1,"position":"Apprentice"}]"#;
        let store = Arc::new(MemoryBlobStore::with_entry(ROSTER_STORAGE_KEY, raw));
        let mut roster = RosterStore::load(store);

        let first = roster.create(jane());
        let second = roster.create(jane());
        assert_ne!(first.id, "9223372036854775807");
        assert_ne!(first.id, second.id);
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn legacy_records_get_defaults() {
        let raw = r#"[
            {"id":"1","name":"Legacy","photoUrl":"x"},
            {"id":"2","name":"Empty","photoUrl":"y","technicianNumber":0,"position":""},
            {"id":3,"name":"Numeric","photoUrl":"z","technicianNumber":"12","position":"Tier 3 Lead"}
        ]"#;
        let templates = decode_snapshot(raw).unwrap();
        assert_eq!(templates.len(), 3);
        assert_eq!(templates[0].technician_number, 0);
        assert_eq!(templates[0].position, Position::Apprentice);
        assert_eq!(templates[1].position, Position::Apprentice);
        assert_eq!(templates[2].id, "3");
        assert_eq!(templates[2].technician_number, 12);
        assert_eq!(templates[2].position, Position::Tier3Lead);
    }

    #[test]
    fn unknown_position_falls_back_to_default() {
        let raw = r#"[{"id":"1","name":"A","photoUrl":"x","technicianNumber":4,"position":"Foreman"}]"#;
        let templates = decode_snapshot(raw).unwrap();
        assert_eq!(templates[0].position, Position::Apprentice);
        assert_eq!(templates[0].technician_number, 4);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let raw = r#"[{"name":"no id"}, 42, {"id":"7","name":"Kept"}]"#;
        let templates = decode_snapshot(raw).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Kept");
    }

    #[test]
    fn corrupt_snapshot_loads_as_empty() {
        let store = Arc::new(MemoryBlobStore::with_entry(ROSTER_STORAGE_KEY, "{not json"));
        let roster = RosterStore::load(store);
        assert!(roster.is_empty());
    }

    #[test]
    fn write_failures_do_not_fail_mutations() {
        let mut roster = RosterStore::load(Arc::new(FailingStore));
        let created = roster.create(jane());
        assert!(roster.contains(&created.id));
        assert!(roster.delete(&created.id));
    }
}
