use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::technician::Position;

/// A saved, reusable worker profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTechnician {
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub technician_number: i64,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCreateInput {
    pub name: String,
    pub photo_url: String,
    pub technician_number: i64,
    #[serde(default)]
    pub position: Position,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpdateInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub technician_number: Option<i64>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl TemplateUpdateInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.photo_url.is_none()
            && self.technician_number.is_none()
            && self.position.is_none()
    }
}

/// Where the photo for a template being saved comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum PhotoSource {
    /// A local image file, converted to a data URI on save.
    File(PathBuf),
    /// An already resolved URI or data URI.
    Url(String),
}

/// Raw values from the add/edit template dialog.
///
/// `technician_number` is kept as typed so that validation can report a
/// friendly message instead of a parse error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub technician_number: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub photo: Option<PhotoSource>,
}
