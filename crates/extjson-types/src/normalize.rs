//! Conversion of parsed JSON values into BSON.
//!
//! Wrapper objects follow the MongoDB Extended JSON v2 spec:
//! https://www.mongodb.com/docs/manual/reference/mongodb-extended-json/
//!
//! A wrapper is only recognized when the object consists of exactly the
//! wrapper keys. `{"$oid": "...", "note": "x"}` stays a plain sub-document.

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use bson::{oid::ObjectId, spec::BinarySubtype, Binary, Bson, Document, Regex, Timestamp};
use serde_json::{Map, Value};

/// Optional coercions applied on top of Extended JSON handling.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Convert plain strings that parse as RFC 3339 timestamps into BSON dates.
    pub coerce_iso_dates: bool,
}

impl NormalizeOptions {
    pub fn with_coerce_iso_dates(mut self, coerce_iso_dates: bool) -> Self {
        self.coerce_iso_dates = coerce_iso_dates;
        self
    }
}

/// Convert a JSON object into a BSON document.
///
/// Fails if `value` is not an object, or if the object is itself an Extended
/// JSON wrapper (a bare `{"$oid": ...}` is a value, not a document).
pub fn json_to_document(value: Value, options: &NormalizeOptions) -> Result<Document> {
    match value {
        Value::Object(obj) => match convert_object(obj, options)? {
            Bson::Document(doc) => Ok(doc),
            other => bail!(
                "expected a document, found an Extended JSON {:?} value",
                other.element_type()
            ),
        },
        other => bail!("expected a JSON object, found {}", json_kind(&other)),
    }
}

/// Convert any JSON value into BSON.
pub fn json_to_bson(value: Value, options: &NormalizeOptions) -> Result<Bson> {
    match value {
        Value::Null => Ok(Bson::Null),
        Value::Bool(b) => Ok(Bson::Boolean(b)),
        Value::Number(n) => Ok(convert_number(&n)),
        Value::String(s) => Ok(convert_string(s, options)),
        Value::Array(items) => {
            let mut array = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                array.push(json_to_bson(item, options).with_context(|| format!("index {index}"))?);
            }
            Ok(Bson::Array(array))
        }
        Value::Object(obj) => convert_object(obj, options),
    }
}

fn convert_number(n: &serde_json::Number) -> Bson {
    if let Some(i) = n.as_i64() {
        match i32::try_from(i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(i),
        }
    } else {
        // u64 above i64::MAX or a float
        Bson::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn convert_string(s: String, options: &NormalizeOptions) -> Bson {
    if options.coerce_iso_dates {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
            return Bson::DateTime(bson::DateTime::from_chrono(dt.to_utc()));
        }
    }
    Bson::String(s)
}

fn convert_object(obj: Map<String, Value>, options: &NormalizeOptions) -> Result<Bson> {
    if let Some(wrapped) = convert_wrapper(&obj, options)? {
        return Ok(wrapped);
    }

    let mut doc = Document::new();
    for (key, val) in obj {
        let converted = json_to_bson(val, options).with_context(|| format!("field `{key}`"))?;
        doc.insert(key, converted);
    }
    Ok(Bson::Document(doc))
}

/// Returns `Ok(None)` when `obj` is not an Extended JSON wrapper.
fn convert_wrapper(obj: &Map<String, Value>, options: &NormalizeOptions) -> Result<Option<Bson>> {
    if obj.len() == 2 {
        if let (Some(pattern), Some(flags)) = (obj.get("$regex"), obj.get("$options")) {
            // Legacy regex format
            let pattern = expect_str(pattern, "$regex")?;
            let flags = expect_str(flags, "$options")?;
            return Ok(Some(regex(pattern, flags)));
        }
    }

    if is_dbref(obj) {
        return convert_dbref(obj, options).map(Some);
    }

    if obj.len() != 1 {
        return Ok(None);
    }
    let Some((key, value)) = obj.iter().next() else {
        return Ok(None);
    };

    let converted = match key.as_str() {
        "$oid" => {
            let hex = expect_str(value, key)?;
            Bson::ObjectId(
                ObjectId::parse_str(hex).with_context(|| format!("invalid ObjectId `{hex}`"))?,
            )
        }
        "$date" => Bson::DateTime(convert_date(value)?),
        "$numberInt" => {
            let raw = expect_str(value, key)?;
            Bson::Int32(
                raw.parse::<i32>()
                    .with_context(|| format!("invalid $numberInt `{raw}`"))?,
            )
        }
        "$numberLong" => {
            let raw = expect_str(value, key)?;
            Bson::Int64(
                raw.parse::<i64>()
                    .with_context(|| format!("invalid $numberLong `{raw}`"))?,
            )
        }
        "$numberDouble" => {
            let raw = expect_str(value, key)?;
            let parsed = match raw {
                "Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                "NaN" => f64::NAN,
                other => other
                    .parse::<f64>()
                    .with_context(|| format!("invalid $numberDouble `{other}`"))?,
            };
            Bson::Double(parsed)
        }
        "$numberDecimal" => {
            // Decimal128 encoding is left to the bson crate's own Extended JSON parser.
            Bson::try_from(Value::Object(obj.clone()))
                .map_err(|e| anyhow!("invalid $numberDecimal: {e}"))?
        }
        "$binary" => convert_binary(value)?,
        "$timestamp" => {
            let ts = value
                .as_object()
                .ok_or_else(|| anyhow!("$timestamp must be an object with `t` and `i`"))?;
            let time = expect_u32(ts.get("t"), "$timestamp.t")?;
            let increment = expect_u32(ts.get("i"), "$timestamp.i")?;
            Bson::Timestamp(Timestamp { time, increment })
        }
        "$regularExpression" => {
            let re = value.as_object().ok_or_else(|| {
                anyhow!("$regularExpression must be an object with `pattern` and `options`")
            })?;
            let pattern = expect_field_str(re, "pattern")?;
            let flags = match re.get("options") {
                Some(flags) => expect_str(flags, "options")?,
                None => "",
            };
            regex(pattern, flags)
        }
        "$minKey" => Bson::MinKey,
        "$maxKey" => Bson::MaxKey,
        "$undefined" => Bson::Undefined,
        _ => return Ok(None),
    };

    Ok(Some(converted))
}

fn convert_date(value: &Value) -> Result<bson::DateTime> {
    match value {
        // Relaxed format
        Value::String(s) => {
            let dt = chrono::DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("invalid $date `{s}`"))?;
            Ok(bson::DateTime::from_chrono(dt.to_utc()))
        }
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| anyhow!("$date milliseconds must be an integer, got {n}"))?;
            Ok(bson::DateTime::from_millis(millis))
        }
        // Canonical format: {"$date": {"$numberLong": "<millis>"}}
        Value::Object(inner) => {
            let raw = inner
                .get("$numberLong")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("$date object must contain a $numberLong string"))?;
            let millis = raw
                .parse::<i64>()
                .with_context(|| format!("invalid $date $numberLong `{raw}`"))?;
            Ok(bson::DateTime::from_millis(millis))
        }
        other => bail!("$date must be a string, integer or object, found {}", json_kind(other)),
    }
}

fn convert_binary(value: &Value) -> Result<Bson> {
    let bin = value
        .as_object()
        .ok_or_else(|| anyhow!("$binary must be an object with `base64` and `subType`"))?;
    let encoded = expect_field_str(bin, "base64")?;
    let subtype = match bin.get("subType") {
        Some(raw) => {
            let raw = expect_str(raw, "subType")?;
            u8::from_str_radix(raw, 16).with_context(|| format!("invalid binary subType `{raw}`"))?
        }
        None => 0,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("invalid base64 in $binary")?;
    Ok(Bson::Binary(Binary {
        subtype: BinarySubtype::from(subtype),
        bytes,
    }))
}

fn is_dbref(obj: &Map<String, Value>) -> bool {
    obj.contains_key("$ref")
        && obj.contains_key("$id")
        && obj.keys().all(|k| matches!(k.as_str(), "$ref" | "$id" | "$db"))
}

/// DBRefs stay embedded documents; only the `$id` is normalized.
fn convert_dbref(obj: &Map<String, Value>, options: &NormalizeOptions) -> Result<Bson> {
    let mut doc = Document::new();
    doc.insert("$ref", expect_field_str(obj, "$ref")?);
    let id = obj.get("$id").cloned().unwrap_or(Value::Null);
    doc.insert("$id", json_to_bson(id, options).context("field `$id`")?);
    if let Some(db) = obj.get("$db") {
        doc.insert("$db", expect_str(db, "$db")?);
    }
    Ok(Bson::Document(doc))
}

fn regex(pattern: &str, flags: &str) -> Bson {
    let mut flags: Vec<char> = flags.chars().collect();
    flags.sort_unstable();
    Bson::RegularExpression(Regex {
        pattern: pattern.to_string(),
        options: flags.into_iter().collect(),
    })
}

fn expect_str<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| anyhow!("{name} must be a string, found {}", json_kind(value)))
}

fn expect_field_str<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    match obj.get(name) {
        Some(value) => expect_str(value, name),
        None => bail!("missing `{name}`"),
    }
}

fn expect_u32(value: Option<&Value>, name: &str) -> Result<u32> {
    value
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| anyhow!("{name} must be an unsigned 32-bit integer"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
