//! JSON document model.
//!
//! A persisted scene is `{ "data": [DocumentNode, ...] }` where every document
//! node is an object carrying a `type` tag, its kind fields and optionally a
//! `children` array. Entries are kept as raw JSON so that restoration can be
//! lenient about malformed parts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Fields = Map<String, Value>;

pub const TYPE_FIELD: &str = "type";
pub const CHILDREN_FIELD: &str = "children";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("document does not contain an array property 'data'")]
    MissingData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub data: Vec<Value>,
}

impl SceneDocument {
    pub fn new(data: Vec<Value>) -> Self {
        Self { data }
    }

    /// Parses a document, accepting any content as long as `data` is an array.
    pub fn from_json(text: &str) -> Result<Self, FormatError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| FormatError::Json(err.to_string()))?;
        match value {
            Value::Object(mut root) => match root.remove("data") {
                Some(Value::Array(data)) => Ok(Self { data }),
                _ => Err(FormatError::MissingData),
            },
            _ => Err(FormatError::MissingData),
        }
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_fields()).to_string()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&Value::Object(self.to_fields()))
            .unwrap_or_else(|_| self.to_json())
    }

    fn to_fields(&self) -> Fields {
        let mut root = Fields::new();
        root.insert("data".into(), Value::Array(self.data.clone()));
        root
    }
}

/// Name of a JSON value's type, as reported in document errors.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads a field as text: strings as is, numbers and booleans printed,
/// anything else absent.
pub fn text_field(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
