//! Deserializers that accept the loosely typed fields hosted models tend to
//! produce: numbers as strings, strings as numbers, lists with stray entries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::analysis::types::FirstAidStep;
use crate::db::models::Metric;

/// String, number or bool become `Some(text)`; null, blanks and containers become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

pub fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

/// Keeps the scalar entries of an array; anything that is not an array is empty.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

pub fn value_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    })
}

/// Drops entries that do not carry name, value, unit and status together.
pub fn metrics<'de, D>(deserializer: D) -> Result<Vec<Metric>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().filter_map(metric_from_value).collect(),
        _ => Vec::new(),
    })
}

/// Array entries that read as `T`; the rest are dropped. Null or a non-array is empty.
pub fn object_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// An object that reads as `T`, otherwise `T::default()`.
pub fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(opt_object(deserializer)?.unwrap_or_default())
}

pub fn opt_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(obj @ Value::Object(_)) => serde_json::from_value(obj).ok(),
        _ => None,
    })
}

/// Steps given as plain strings become titled steps.
pub fn first_aid_steps<'de, D>(deserializer: D) -> Result<Vec<FirstAidStep>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).ok(),
            other => value_to_string(&other).map(|title| FirstAidStep {
                step: None,
                title,
                description: String::new(),
                icon: None,
            }),
        })
        .collect())
}

pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_number))
}

/// 0-100, accepting "85%" style strings.
pub fn percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_number(deserializer)?
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0))
}

/// 1-10, defaulting to the midpoint.
pub fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_number(deserializer)?
        .map(|n| n.round().clamp(1.0, 10.0) as u8)
        .unwrap_or(5))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn metric_from_value(value: &Value) -> Option<Metric> {
    let obj = value.as_object()?;
    let name = obj.get("name").and_then(value_to_string)?;
    let value = obj.get("value").and_then(value_to_number)?;
    // Units are legitimately empty for ratios, but the key must be there.
    let unit = match obj.get("unit")? {
        Value::Null => return None,
        other => value_to_string(other).unwrap_or_default(),
    };
    let status = obj.get("status").and_then(value_to_string)?;

    Some(Metric {
        name,
        value,
        unit,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct LooseFields {
        #[serde(default, deserialize_with = "opt_string")]
        text: Option<String>,
        #[serde(default, deserialize_with = "string_list")]
        items: Vec<String>,
        #[serde(default, deserialize_with = "metrics")]
        metrics: Vec<Metric>,
        #[serde(default, deserialize_with = "percent")]
        probability: u8,
        #[serde(default = "five", deserialize_with = "score")]
        score: u8,
        #[serde(default, deserialize_with = "flag")]
        urgent: bool,
    }

    fn five() -> u8 {
        5
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Entry {
        #[serde(default, deserialize_with = "string_or_default")]
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Nested {
        #[serde(default, deserialize_with = "object_list")]
        entries: Vec<Entry>,
        #[serde(default, deserialize_with = "object_or_default")]
        single: Entry,
        #[serde(default, deserialize_with = "opt_object")]
        optional: Option<Entry>,
        #[serde(default, deserialize_with = "first_aid_steps")]
        steps: Vec<FirstAidStep>,
    }

    #[test]
    fn test_scalars_are_coerced() {
        let fields: LooseFields = serde_json::from_value(json!({
            "text": 42,
            "items": ["a", 1, null, {"x": 1}, "  "],
            "probability": "85%",
            "score": "12",
            "urgent": "true"
        }))
        .unwrap();

        assert_eq!(fields.text.as_deref(), Some("42"));
        assert_eq!(fields.items, vec!["a".to_string(), "1".to_string()]);
        assert_eq!(fields.probability, 85);
        assert_eq!(fields.score, 10);
        assert!(fields.urgent);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let fields: LooseFields = serde_json::from_value(json!({ "text": "" })).unwrap();
        assert!(fields.text.is_none());
        assert!(fields.items.is_empty());
        assert_eq!(fields.probability, 0);
        assert_eq!(fields.score, 5);
        assert!(!fields.urgent);
    }

    #[test]
    fn test_incomplete_metrics_are_dropped() {
        let fields: LooseFields = serde_json::from_value(json!({
            "metrics": [
                { "name": "Hemoglobin", "value": "11.0", "unit": "g/dL", "status": "Low" },
                { "name": "WBC", "value": 12000, "unit": "", "status": "High" },
                { "name": "Platelets", "unit": "10^3/uL", "status": "Normal" },
                { "name": "Glucose", "value": 90, "status": "Normal" },
                { "value": 1, "unit": "x", "status": "Normal" },
                "not a metric"
            ]
        }))
        .unwrap();

        assert_eq!(fields.metrics.len(), 2);
        assert_eq!(fields.metrics[0].name, "Hemoglobin");
        assert_eq!(fields.metrics[0].value, 11.0);
        assert_eq!(fields.metrics[1].unit, "");
    }

    #[test]
    fn test_nested_fields_tolerate_nulls_and_scalars() {
        let nested: Nested = serde_json::from_value(json!({
            "entries": [{"name": "Influenza"}, "Cold", null, {"name": 3}],
            "single": "high",
            "optional": null,
            "steps": ["Rest", {"title": "Hydrate", "description": "Small sips"}, null]
        }))
        .unwrap();

        assert_eq!(nested.entries.len(), 2);
        assert_eq!(nested.entries[1].name, "3");
        assert_eq!(nested.single, Entry::default());
        assert!(nested.optional.is_none());
        assert_eq!(nested.steps.len(), 2);
        assert_eq!(nested.steps[0].title, "Rest");
        assert_eq!(nested.steps[1].description, "Small sips");

        let empty: Nested = serde_json::from_value(json!({ "entries": null, "steps": "Rest" })).unwrap();
        assert!(empty.entries.is_empty());
        assert!(empty.steps.is_empty());
    }
}
