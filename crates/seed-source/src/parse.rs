//! JSON parsing of seed content into BSON documents.

use crate::error::{Result, SourceError};
use bson::Document;
use extjson_types::{json_to_document, NormalizeOptions};
use serde_json::Value;
use std::path::Path;

/// Parse the raw bytes of a seed file into documents.
///
/// The content must be a JSON array of objects, or a single object which is
/// treated as a one-element list.
pub fn parse_documents(
    bytes: &[u8],
    path: &Path,
    options: &NormalizeOptions,
) -> Result<Vec<Document>> {
    if bytes.is_empty() {
        return Err(SourceError::file(path, "file is empty"));
    }

    let origin = path.display().to_string();
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SourceError::parse(&origin, e.to_string()))?;

    let records = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        other => {
            return Err(SourceError::parse(
                origin,
                format!(
                    "expected a JSON array of objects or a single object, found {}",
                    describe(&other)
                ),
            ))
        }
    };

    records_to_documents(records, &origin, options)
}

/// Normalize a list of JSON records into BSON documents.
///
/// `origin` only feeds error messages.
pub fn records_to_documents(
    records: Vec<Value>,
    origin: &str,
    options: &NormalizeOptions,
) -> Result<Vec<Document>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            json_to_document(record, options)
                .map_err(|e| SourceError::parse(origin, format!("document {index}: {e:#}")))
        })
        .collect()
}

/// Collection name for a seed file: its base name without extension.
pub fn collection_name_for(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            SourceError::Config(format!(
                "cannot derive a collection name from '{}'",
                path.display()
            ))
        })
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
