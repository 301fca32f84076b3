use serde_json::Value as JsonValue;

const REDACTED: &str = "[REDACTED]";
const PREVIEW_CHARS: usize = 48;

/// Masks personal fields (names, photos) before a payload is logged.
pub fn redact_sensitive_data(data: &JsonValue) -> JsonValue {
    match data {
        JsonValue::Object(map) => {
            let mut redacted_map = serde_json::Map::new();
            for (key, val) in map {
                let redacted_val = if is_sensitive_field(key) {
                    redact_string_value(val)
                } else {
                    redact_sensitive_data(val)
                };
                redacted_map.insert(key.clone(), redacted_val);
            }
            JsonValue::Object(redacted_map)
        }
        JsonValue::Array(arr) => JsonValue::Array(arr.iter().map(redact_sensitive_data).collect()),
        _ => data.clone(),
    }
}

/// Shortens long strings such as data URIs for display and logs.
pub fn preview(value: &str) -> String {
    if value.chars().count() <= PREVIEW_CHARS {
        return value.to_string();
    }
    let head: String = value.chars().take(PREVIEW_CHARS).collect();
    format!("{head}… ({} bytes)", value.len())
}

fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    matches!(
        lower.as_str(),
        "name" | "photourl" | "photo_url" | "companylogo" | "company_logo"
    )
}

fn redact_string_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if !s.is_empty() => JsonValue::String(REDACTED.to_string()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_personal_fields_at_any_depth() {
        let data = json!({
            "name": "Jane Doe",
            "avgPerformance": 91,
            "entries": [
                { "name": "John", "photoUrl": "data:image/png;base64,AAAA", "impactPoints": 40 }
            ]
        });

        let redacted = redact_sensitive_data(&data);

        assert_eq!(redacted["name"], REDACTED);
        assert_eq!(redacted["avgPerformance"], 91);
        assert_eq!(redacted["entries"][0]["name"], REDACTED);
        assert_eq!(redacted["entries"][0]["photoUrl"], REDACTED);
        assert_eq!(redacted["entries"][0]["impactPoints"], 40);
    }

    #[test]
    fn leaves_empty_and_non_string_values() {
        let data = json!({ "name": "", "position": "Apprentice", "count": 3 });
        assert_eq!(redact_sensitive_data(&data), data);
    }

    #[test]
    fn previews_shorten_long_values() {
        let long = "x".repeat(100);
        let shortened = preview(&long);
        assert!(shortened.starts_with(&"x".repeat(PREVIEW_CHARS)));
        assert!(shortened.ends_with("(100 bytes)"));
        assert_eq!(preview("short"), "short");
    }
}
