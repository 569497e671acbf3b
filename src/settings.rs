//! The generic settings tree handed to the route validators.
//!
//! Settings arrive already decoded from whatever file format the host uses, so values are loosely typed. The validators
//! decode each field explicitly with the helpers in this module and report the kind they actually found.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use strum::IntoStaticStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("could not read settings: {0}")]
    Read(std::io::Error),
    #[error("could not deserialize settings: {0}")]
    Deserialize(serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    root: Value,
}

impl Settings {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsLoadError> {
        serde_json::from_str(json).map(Self::from_value).map_err(SettingsLoadError::Deserialize)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsLoadError> {
        let file = fs::File::open(path).map_err(|error| {
            tracing::error!(?error, settings.path =? path, message_id = "Zo3ahgh1", "could not open settings file");
            SettingsLoadError::Read(error)
        })?;
        let root = serde_json::from_reader(file).map_err(|error| {
            tracing::error!(?error, settings.path =? path, message_id = "eiK4quoo", "could not parse settings file");
            SettingsLoadError::Deserialize(error)
        })?;
        tracing::debug!(settings.path =? path, message_id = "Ahv0ieSh", "loaded settings");
        Ok(Self::from_value(root))
    }

    /// Looks up a dotted key such as `tun.unsafe_routes`. Every segment but the last must name a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.').try_fold(&self.root, |value, segment| value.as_object()?.get(segment))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

/// Names used when reporting a value of the wrong type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Map,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Integer,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Map,
        }
    }

    pub fn as_static_str(&self) -> &'static str {
        self.into()
    }
}

pub fn as_map(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// Textual form of a scalar, used before integer and boolean parsing so `"1500"` and `1500` decode alike.
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("invalid syntax")]
pub struct ParseBoolError;

/// Accepts the usual spellings of a boolean, including `1`/`0` and `t`/`f`.
pub fn parse_bool(text: &str) -> Result<bool, ParseBoolError> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ParseBoolError),
    }
}
