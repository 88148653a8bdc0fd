//! Building settings maps from JSON sources.
//!
//! The wire shape for a delta is a JSON object; nesting is allowed and
//! flattens into dotted keys, so `{"a": {"b": "1"}}` and `{"a.b": "1"}`
//! mean the same thing. Array elements flatten under their index. A JSON
//! `null` becomes an explicit null marker, which is how deletions travel.

use crate::settings::{Settings, SettingsBuilder};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("settings source is not a JSON object")]
    UnexpectedRoot,
    #[error("malformed settings source: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn settings_from_json_str(source: &str) -> Result<Settings, SourceError> {
    let value: Value = serde_json::from_str(source)?;
    settings_from_json(&value)
}

pub fn settings_from_json(value: &Value) -> Result<Settings, SourceError> {
    let Value::Object(map) = value else {
        return Err(SourceError::UnexpectedRoot);
    };
    let mut builder = Settings::builder();
    for (key, nested) in map {
        builder = flatten(builder, key, nested);
    }
    Ok(builder.build())
}

fn flatten(mut builder: SettingsBuilder, path: &str, value: &Value) -> SettingsBuilder {
    match value {
        Value::Null => builder.put_null(path),
        Value::Bool(flag) => builder.put(path, flag),
        Value::Number(number) => builder.put(path, number),
        Value::String(text) => builder.put(path, text),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                builder = flatten(builder, &format!("{path}.{index}"), item);
            }
            builder
        }
        Value::Object(map) => {
            for (key, nested) in map {
                builder = flatten(builder, &format!("{path}.{key}"), nested);
            }
            builder
        }
    }
}
