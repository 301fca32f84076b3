use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::technician::{Position, TechnicianStats};

/// Stats record as returned by the generative service, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStats {
    pub name: String,
    pub position: String,
    pub technician_number: f64,
    pub avg_performance: f64,
    pub ticket_value: f64,
    pub impact_points: f64,
    pub five_star_reviews: f64,
    pub memberships_sold: f64,
}

impl GeneratedStats {
    /// Converts to form stats. Badges are always empty and an unrecognised
    /// position falls back to the default one.
    pub fn into_stats(self) -> TechnicianStats {
        TechnicianStats {
            name: self.name.trim().to_string(),
            position: Position::from_label(&self.position).unwrap_or_default(),
            technician_number: self.technician_number,
            avg_performance: self.avg_performance,
            ticket_value: self.ticket_value,
            impact_points: self.impact_points,
            five_star_reviews: self.five_star_reviews,
            memberships_sold: self.memberships_sold,
            badges: Vec::new(),
        }
    }
}

/// Metadata describing the provider that produced a response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiProviderMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<HashMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<JsonValue>,
}

/// Whether random data generation is available.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiStatusDto {
    pub has_api_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProviderMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_checked_at: String,
}
