//! Forgiving deserializers for model-written JSON.
//!
//! Models return `"duration": 1.5`, `"number": "3"` or `"characters": null`
//! often enough that strict field types would reject most answers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Integers, floats (rounded) and numeric strings; anything else is `None`.
pub fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

pub fn opt_whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(whole_number))
}

/// Numbers and numeric strings as `f64`.
pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

/// Strings, numbers and bools as text; empty strings and other shapes are `None`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// A list of strings from an array, a comma-separated string or null.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "opt_whole_number")]
        minutes: Option<i64>,
        #[serde(default, deserialize_with = "string_list")]
        names: Vec<String>,
        #[serde(default, deserialize_with = "opt_text")]
        label: Option<String>,
    }

    #[test]
    fn rounds_fractional_minutes() {
        assert_eq!(whole_number(&json!(1.5)), Some(2));
        assert_eq!(whole_number(&json!("3")), Some(3));
        assert_eq!(whole_number(&json!("about three")), None);
    }

    #[test]
    fn tolerates_nulls_and_odd_shapes() {
        let row: Row =
            serde_json::from_value(json!({"minutes": null, "names": "ANA, JOÃO", "label": 35}))
                .unwrap();
        assert_eq!(row.minutes, None);
        assert_eq!(row.names, vec!["ANA".to_string(), "JOÃO".to_string()]);
        assert_eq!(row.label.as_deref(), Some("35"));

        let row: Row = serde_json::from_value(json!({})).unwrap();
        assert!(row.names.is_empty());
    }
}
