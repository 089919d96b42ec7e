//! Decoding of the upstream JSON payload into raw lines.
use serde_json::Value;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Name of the member carrying a line in each payload record.
pub const LINE_MEMBER: &str = "ssimfile";

/// Decode `text` into raw lines, in order.
///
/// The payload is an array of objects each carrying one line in an `ssimfile`
/// member. It may arrive encoded more than once, i.e., as a JSON string whose
/// content is the JSON payload. Entries that are not objects or whose line is
/// missing or empty are skipped.
///
/// # Example
/// ```
/// let text = r#""[{\"ssimfile\": \"1AIRLINE\"}, {\"ssimfile\": \"3 AF 0415\"}]""#;
/// let lines = ssim::payload::decode_payload(text).unwrap();
/// assert_eq!(lines, vec!["1AIRLINE", "3 AF 0415"]);
/// ```
///
/// # Errors
/// [Error::Decode] if the text is not JSON and [Error::PayloadShape] if it does
/// not decode to an array.
pub fn decode_payload(text: &str) -> Result<Vec<String>> {
    let mut value: Value = serde_json::from_str(text)?;
    let mut depth = 1;
    while let Value::String(inner) = value {
        value = serde_json::from_str(&inner)?;
        depth += 1;
    }
    trace!(depth, "decoded payload");

    let Value::Array(records) = value else {
        return Err(Error::PayloadShape(format!(
            "expected an array of records, got {}",
            kind(&value)
        )));
    };

    let total = records.len();
    let lines: Vec<String> = records
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(mut fields) => match fields.remove(LINE_MEMBER) {
                Some(Value::String(line)) if !line.is_empty() => Some(line),
                _ => None,
            },
            _ => None,
        })
        .collect();
    debug!(records = total, lines = lines.len(), "decoded payload lines");
    Ok(lines)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
