//! Bulk request rendering and response classification.

use serde_json::{json, Map, Value};

use crate::config::WriterConfig;
use crate::errors::IndexWriteError;
use crate::interfaces::BulkAck;
use smalldata_shared::{Batch, ItemFailure};

const INDEX_NOT_FOUND: &str = "index_not_found_exception";
const REJECTED_EXECUTION: &str = "es_rejected_execution_exception";

/// Render a batch as bulk NDJSON lines, without trailing newlines.
///
/// Each document yields an `index` action line followed by its source line.
pub(crate) fn render_bulk_lines(batch: &Batch, config: &WriterConfig) -> Vec<String> {
    let mut lines = Vec::with_capacity(batch.len() * 2);

    for doc in batch.documents() {
        let mut action = Map::new();
        action.insert("_index".to_string(), json!(config.target_index_name));
        action.insert("_id".to_string(), json!(doc.id()));
        if let Some(ref content_type) = config.content_type_name {
            action.insert("_type".to_string(), json!(content_type));
        }

        lines.push(json!({ "index": action }).to_string());
        lines.push(doc.source().to_string());
    }

    lines
}

/// Whether an HTTP status signals a condition worth retrying.
fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Error `type` field from a top-level or per-item error object.
fn error_type(error: &Value) -> Option<&str> {
    error.get("type").and_then(Value::as_str)
}

fn describe_error(error: &Value) -> String {
    let kind = error_type(error).unwrap_or("unknown_error");
    match error.get("reason").and_then(Value::as_str) {
        Some(reason) => format!("{}: {}", kind, reason),
        None => kind.to_string(),
    }
}

/// Classify a bulk response into an acknowledgement or a write error.
pub(crate) fn classify_response(
    status: u16,
    body: &str,
    index: &str,
) -> Result<BulkAck, IndexWriteError> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        if status == 404 && error.and_then(error_type) == Some(INDEX_NOT_FOUND) {
            return Err(IndexWriteError::index_missing(index));
        }

        let detail = error
            .map(describe_error)
            .unwrap_or_else(|| body.chars().take(256).collect());
        let msg = format!("Bulk request failed with status {}: {}", status, detail);

        return if is_transient_status(status) {
            Err(IndexWriteError::transient(msg))
        } else {
            Err(IndexWriteError::fatal(msg))
        };
    }

    let Some(response) = parsed else {
        return Err(IndexWriteError::transient(
            "Bulk response body was not valid JSON",
        ));
    };

    let items = response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let took_ms = response.get("took").and_then(Value::as_u64);

    let has_errors = response
        .get("errors")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !has_errors {
        return Ok(BulkAck {
            items: items.len(),
            took_ms,
        });
    }

    let failures = collect_item_failures(items);
    if failures.is_empty() {
        return Ok(BulkAck {
            items: items.len(),
            took_ms,
        });
    }

    if failures.iter().any(|(_, kind)| kind == INDEX_NOT_FOUND) {
        return Err(IndexWriteError::index_missing(index));
    }

    if failures
        .iter()
        .all(|(item, kind)| item.status == 429 || kind == REJECTED_EXECUTION)
    {
        return Err(IndexWriteError::transient(format!(
            "{} of {} bulk items rejected for capacity",
            failures.len(),
            items.len()
        )));
    }

    let reason = format!(
        "{} of {} bulk items failed, first: {}",
        failures.len(),
        items.len(),
        failures[0].0.reason
    );
    Err(IndexWriteError::fatal_items(
        reason,
        failures.into_iter().map(|(item, _)| item).collect(),
    ))
}

/// Extract failed items with their error type from a bulk `items` array.
fn collect_item_failures(items: &[Value]) -> Vec<(ItemFailure, String)> {
    items
        .iter()
        .filter_map(|item| {
            // Each item is keyed by its action name (`index`, `create`, ...).
            let result = item.as_object()?.values().next()?;
            let error = result.get("error")?;
            let id = result
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let status = result
                .get("status")
                .and_then(Value::as_u64)
                .unwrap_or_default() as u16;
            let kind = error_type(error).unwrap_or_default().to_string();

            Some((
                ItemFailure {
                    id,
                    status,
                    reason: describe_error(error),
                },
                kind,
            ))
        })
        .collect()
}
