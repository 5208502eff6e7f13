//! Infer a record's name and location from its crawl payload.
//!
//! Only placeholder values are ever replaced, so running this twice on the
//! same payload changes nothing the second time.

use serde_json::Value;

use crate::types::record::{Record, RecordUpdate};

const NAME_PLACEHOLDERS: &[&str] = &[
    "",
    "unknown",
    "unknown business",
    "new business",
    "business",
    "untitled",
];

const LOCATION_PLACEHOLDERS: &[&str] = &["", "unknown", "n/a", "location not set", "unknown location"];

const NAME_KEYS: &[&str] = &["name", "businessName", "business_name", "title"];

pub fn is_placeholder_name(record: &Record) -> bool {
    let name = record.name.trim().to_lowercase();
    NAME_PLACEHOLDERS.contains(&name.as_str()) || name == host_of(&record.url)
}

pub fn is_placeholder_location(location: Option<&str>) -> bool {
    match location {
        None => true,
        Some(value) => LOCATION_PLACEHOLDERS.contains(&value.trim().to_lowercase().as_str()),
    }
}

/// Fields worth backfilling, or `None` when nothing would change.
pub fn identity_update(record: &Record, payload: &Value) -> Option<RecordUpdate> {
    let mut update = RecordUpdate::new();

    if is_placeholder_name(record) {
        if let Some(name) = infer_name(payload) {
            if name != record.name {
                update = update.with_name(name);
            }
        }
    }

    if is_placeholder_location(record.location.as_deref()) {
        if let Some(location) = infer_location(payload) {
            update = update.with_location(Some(location));
        }
    }

    (!update.is_empty()).then_some(update)
}

pub fn infer_name(payload: &Value) -> Option<String> {
    NAME_KEYS
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !NAME_PLACEHOLDERS.contains(&name.to_lowercase().as_str()))
        .map(str::to_string)
}

/// Accepts a plain string, or an object with `city`/`state`/`country` parts.
pub fn infer_location(payload: &Value) -> Option<String> {
    let value = payload.get("location").or_else(|| payload.get("address"))?;

    let location = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(parts) => ["city", "state", "region", "country"]
            .iter()
            .filter_map(|key| parts.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };

    (!is_placeholder_location(Some(&location))).then_some(location)
}

fn host_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme.split('/').next().unwrap_or("");
    host.trim_start_matches("www.").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TeamId;
    use serde_json::json;

    fn record(name: &str, location: Option<&str>) -> Record {
        let mut record = Record::builder()
            .team_id(TeamId::new())
            .url("https://www.joes-diner.com/menu")
            .name(name)
            .build();
        record.location = location.map(str::to_string);
        record
    }

    #[test]
    fn test_fills_placeholder_name_and_location() {
        let payload = json!({
            "name": "Joe's Diner",
            "location": {"city": "Saint Paul", "state": "MN", "country": "US"}
        });
        let update = identity_update(&record("Unknown Business", None), &payload).unwrap();

        assert_eq!(update.name.as_deref(), Some("Joe's Diner"));
        assert_eq!(
            update.location,
            Some(Some("Saint Paul, MN, US".to_string()))
        );
    }

    #[test]
    fn test_domain_name_counts_as_placeholder() {
        let payload = json!({"businessName": "Joe's Diner"});
        let update = identity_update(&record("joes-diner.com", Some("Saint Paul")), &payload).unwrap();
        assert_eq!(update.name.as_deref(), Some("Joe's Diner"));
        assert!(update.location.is_none());
    }

    #[test]
    fn test_never_overwrites_real_values() {
        let payload = json!({"name": "Something Else", "location": "Duluth"});
        assert!(identity_update(&record("Joe's Diner", Some("Saint Paul")), &payload).is_none());
    }

    #[test]
    fn test_ignores_placeholder_values_in_payload() {
        let payload = json!({"name": "Unknown", "title": "Joe's Diner", "location": "N/A"});
        assert_eq!(infer_name(&payload).as_deref(), Some("Joe's Diner"));
        assert!(infer_location(&payload).is_none());
    }

    #[test]
    fn test_is_idempotent() {
        let payload = json!({"name": "Joe's Diner", "location": "Saint Paul, MN"});
        let mut record = record("", None);

        let update = identity_update(&record, &payload).unwrap();
        record.apply(&update);

        assert!(identity_update(&record, &payload).is_none());
    }
}
