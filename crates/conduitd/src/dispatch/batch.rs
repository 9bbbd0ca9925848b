//! Batch protocol.
//!
//! A `batch` request carries `params.commands`, an ordered list of
//! `{type, params?}` objects, and an optional `params.stop_on_error`
//! (default `true`). Sub-commands go through the same resolution as single
//! commands but are not gated again: the gates already ran once for the
//! batch as a whole.
//!
//! `summary.total` always reports the submitted list length, while `items`
//! only holds the entries actually processed before an early stop.

use serde::Serialize;
use serde_json::Value;

use crate::host::JsonObject;

use super::errors::ErrorCode;
use super::response::{CommandResponse, HandlerFailure, reports_success};

/// Command type that triggers the batch protocol.
pub const BATCH_COMMAND: &str = "batch";

const MISSING_COMMANDS: &str = "Missing 'commands' array";
const MISSING_COMMANDS_DETAILS: &str = "batch expects params.commands: [{type, params}]";
const MISSING_TYPE: &str = "Missing command.type";
const BATCH_FAILED: &str = "Batch contains error(s)";

/// Outcome of one processed sub-command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<Value>,
}

impl BatchItem {
    fn missing_type(index: usize) -> Self {
        Self {
            index,
            command_type: None,
            success: false,
            result: None,
            error: Some(MISSING_TYPE.to_string()),
            error_code: Some(ErrorCode::BadRequest.as_str().to_string()),
            error_details: None,
            error_info: None,
        }
    }

    fn from_result(index: usize, command_type: &str, result: JsonObject) -> Self {
        let mut item = Self {
            index,
            command_type: Some(command_type.to_string()),
            success: true,
            result: None,
            error: None,
            error_code: None,
            error_details: None,
            error_info: None,
        };
        if reports_success(&result) {
            item.result = Some(result);
        } else {
            let failure = HandlerFailure::extract(&result);
            item.success = false;
            item.error = Some(failure.message);
            item.error_code = Some(failure.code);
            item.error_details = failure.details;
            item.error_info = failure.info;
        }
        item
    }
}

/// Counters describing a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub ok: usize,
    pub error: usize,
    pub stop_on_error: bool,
}

#[derive(Debug, Serialize)]
struct BatchOutcome {
    items: Vec<BatchItem>,
    summary: BatchSummary,
}

/// Runs a batch, resolving each sub-command with `resolve`.
///
/// `resolve` receives the sub-command type and params and returns a
/// handler-shaped result object.
pub fn run<F>(params: &JsonObject, mut resolve: F) -> CommandResponse
where
    F: FnMut(&str, &JsonObject) -> JsonObject,
{
    let stop_on_error = params
        .get("stop_on_error")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let Some(commands) = params.get("commands").and_then(Value::as_array) else {
        return CommandResponse::from_error(
            ErrorCode::BadRequest,
            MISSING_COMMANDS,
            Some(MISSING_COMMANDS_DETAILS),
        );
    };

    let empty = JsonObject::new();
    let mut items = Vec::with_capacity(commands.len());
    for (index, entry) in commands.iter().enumerate() {
        let command = entry.as_object();
        let command_type = command.and_then(|command| command.get("type")).and_then(Value::as_str);
        let item = match (command, command_type) {
            (Some(command), Some(command_type)) => {
                let sub_params = command
                    .get("params")
                    .and_then(Value::as_object)
                    .unwrap_or(&empty);
                BatchItem::from_result(index, command_type, resolve(command_type, sub_params))
            }
            _ => BatchItem::missing_type(index),
        };
        let failed = !item.success;
        items.push(item);
        if failed && stop_on_error {
            break;
        }
    }

    let ok = items.iter().filter(|item| item.success).count();
    let summary = BatchSummary {
        total: commands.len(),
        ok,
        error: items.len() - ok,
        stop_on_error,
    };
    assemble(BatchOutcome { items, summary })
}

fn assemble(outcome: BatchOutcome) -> CommandResponse {
    let succeeded = outcome.summary.error == 0;
    let result = match serde_json::to_value(&outcome) {
        Ok(Value::Object(result)) => result,
        Ok(_) => JsonObject::new(),
        Err(error) => {
            return CommandResponse::from_error(
                ErrorCode::Exception,
                format!("failed to serialize batch result: {error}"),
                None,
            );
        }
    };
    if succeeded {
        CommandResponse::success(result)
    } else {
        CommandResponse::from_error(ErrorCode::Batch, BATCH_FAILED, None).with_result(result)
    }
}
