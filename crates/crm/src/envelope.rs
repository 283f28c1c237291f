//! Parsing of the CRM's record response envelope.
//!
//! Record writes answer with one entry per submitted record, in submission
//! order:
//!
//! ```json
//! {"data": [{"code": "SUCCESS", "status": "success", "details": {"id": "338..."}}]}
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::CrmError;

/// Outcome of a single record within a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordResult {
    /// The record was created and assigned this id.
    Created(String),
    /// The CRM rejected this record.
    Failed { code: String, message: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Details>,
}

#[derive(Debug, Deserialize)]
struct Details {
    #[serde(default)]
    id: Option<Value>,
}

/// Parses the per-record results of a create call.
pub fn parse_record_results(body: Value) -> Result<Vec<RecordResult>, CrmError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| CrmError::MalformedResponse(format!("missing data array: {e}")))?;

    Ok(envelope.data.into_iter().map(entry_to_result).collect())
}

fn entry_to_result(entry: Entry) -> RecordResult {
    let succeeded = entry
        .status
        .as_deref()
        .is_none_or(|s| s.eq_ignore_ascii_case("success"));

    // The CRM serializes ids as strings, but tolerate numbers.
    let id = entry.details.and_then(|d| d.id).and_then(|id| match id {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    match (succeeded, id) {
        (true, Some(id)) => RecordResult::Created(id),
        _ => RecordResult::Failed {
            code: entry.code.unwrap_or_else(|| "UNKNOWN".to_string()),
            message: entry
                .message
                .unwrap_or_else(|| "record has no assigned id".to_string()),
        },
    }
}
