use serde_json::{json, Value as JsonValue};

use crate::models::technician::Position;

const FIELDS: [&str; 8] = [
    "name",
    "position",
    "technicianNumber",
    "avgPerformance",
    "ticketValue",
    "impactPoints",
    "fiveStarReviews",
    "membershipsSold",
];

/// Prompt asking for one random home appliance technician.
pub fn technician_generation_prompt() -> String {
    let positions = Position::ALL
        .iter()
        .map(|position| format!("'{}'", position.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Generate a realistic full name, a professional job title/position from the following list: \
{positions}, a unique technician number between 1 and 99, and performance statistics for a \
home appliance technician. The stats should be:
- Average Performance Percentage: between 85 and 100
- Job Ticket Value: between 250 and 800
- Impact Points: between 50 and 200
- 5-Star Reviews: between 10 and 50 for a quarter
- Memberships Sold: between 5 and 25 for a quarter"
    )
}

/// Structured-output schema in the provider's OpenAPI subset.
pub fn technician_response_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING", "description": "Technician's full name" },
            "position": {
                "type": "STRING",
                "description": "Technician's professional job title from the provided list"
            },
            "technicianNumber": {
                "type": "INTEGER",
                "description": "A unique number assigned to the technician"
            },
            "avgPerformance": { "type": "INTEGER", "description": "Average performance percentage" },
            "ticketValue": { "type": "INTEGER", "description": "Average job ticket value in dollars" },
            "impactPoints": { "type": "INTEGER", "description": "Internal performance score" },
            "fiveStarReviews": { "type": "INTEGER", "description": "Number of 5-star reviews received" },
            "membershipsSold": { "type": "INTEGER", "description": "Number of service memberships sold" }
        },
        "required": FIELDS
    })
}

/// JSON Schema used to check the returned document before deserialising it.
pub fn technician_validation_schema() -> JsonValue {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": FIELDS,
        "properties": {
            "name": { "type": "string", "minLength": 1 },
            "position": { "type": "string" },
            "technicianNumber": { "type": "number" },
            "avgPerformance": { "type": "number" },
            "ticketValue": { "type": "number" },
            "impactPoints": { "type": "number" },
            "fiveStarReviews": { "type": "number" },
            "membershipsSold": { "type": "number" }
        }
    })
}

pub fn build_generate_content_payload(temperature: f32) -> JsonValue {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": technician_generation_prompt() } ] }
        ],
        "generationConfig": {
            "temperature": temperature,
            "responseMimeType": "application/json",
            "responseSchema": technician_response_schema()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_position() {
        let prompt = technician_generation_prompt();
        for position in Position::ALL {
            assert!(prompt.contains(position.label()));
        }
        assert!(prompt.contains("between 85 and 100"));
    }

    #[test]
    fn payload_requests_json_output() {
        let payload = build_generate_content_payload(1.0);
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            payload["generationConfig"]["responseSchema"]["required"]
                .as_array()
                .map(Vec::len),
            Some(8)
        );
    }
}
