//! Response assembly and the structured error model.
//!
//! Every processed request yields exactly one [`CommandResponse`]. Success
//! responses nest the handler result under `result`; failures carry a plain
//! `error` string for older consumers plus `error_code`, an optional
//! `error_details`, and the same data again as a structured `error_info`
//! object.

use serde::Serialize;
use serde_json::{Value, json};

use crate::host::JsonObject;

use super::errors::ErrorCode;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Top-level status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Structured duplicate of the error fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wire response for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    success: bool,
    status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_info: Option<ErrorInfo>,
}

impl CommandResponse {
    /// Successful response carrying `result`.
    #[must_use]
    pub fn success(result: JsonObject) -> Self {
        Self {
            success: true,
            status: ResponseStatus::Success,
            result: Some(result),
            error: None,
            error_code: None,
            error_details: None,
            error_info: None,
        }
    }

    /// Failure with an arbitrary, possibly handler-defined, code.
    #[must_use]
    pub fn failure(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        let code = code.into();
        let message = message.into();
        let details = details.filter(|details| !details.is_empty());
        Self {
            success: false,
            status: ResponseStatus::Error,
            result: None,
            error: Some(message.clone()),
            error_code: Some(code.clone()),
            error_details: details.clone(),
            error_info: Some(ErrorInfo {
                message,
                code,
                details,
            }),
        }
    }

    /// Failure raised by the bridge itself.
    #[must_use]
    pub fn from_error(code: ErrorCode, message: impl Into<String>, details: Option<&str>) -> Self {
        Self::failure(code.as_str(), message, details.map(str::to_owned))
    }

    /// Converts a handler result object into a response.
    ///
    /// A result whose `success` field is `false` becomes a failure with its
    /// error fields extracted; anything else is a success.
    #[must_use]
    pub fn from_handler_result(result: JsonObject) -> Self {
        if reports_success(&result) {
            Self::success(result)
        } else {
            let failure = HandlerFailure::extract(&result);
            Self::failure(failure.code, failure.message, failure.details)
        }
    }

    /// Attaches a result payload, keeping the current status.
    #[must_use]
    pub fn with_result(mut self, result: JsonObject) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&JsonObject> {
        self.result.as_ref()
    }

    /// Serializes the response to its wire text.
    ///
    /// Serialization of these types cannot fail in practice; should it ever
    /// happen, a fixed `EXCEPTION` document is returned instead.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            json!({
                "success": false,
                "status": "error",
                "error": format!("failed to serialize response: {error}"),
                "error_code": ErrorCode::Exception.as_str(),
            })
            .to_string()
        })
    }
}

/// Returns `false` only when the object carries `"success": false`.
pub(crate) fn reports_success(result: &JsonObject) -> bool {
    !matches!(result.get("success"), Some(Value::Bool(false)))
}

/// Error fields pulled from a failing handler result.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFailure {
    pub message: String,
    pub code: String,
    pub details: Option<String>,
    /// Handler-supplied `error_info`, passed through verbatim in batch items.
    pub info: Option<Value>,
}

impl HandlerFailure {
    /// Extracts error fields, defaulting to `"Unknown error"` and `GENERIC`.
    #[must_use]
    pub fn extract(result: &JsonObject) -> Self {
        let text = |key: &str| result.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            message: text("error").unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            code: text("error_code").unwrap_or_else(|| ErrorCode::Generic.as_str().to_string()),
            details: text("error_details").filter(|details| !details.is_empty()),
            info: result.get("error_info").filter(|info| info.is_object()).cloned(),
        }
    }
}

/// Builds a response-shaped failure object for handler groups to return.
#[must_use]
pub fn error_result(code: &str, message: &str, details: Option<&str>) -> JsonObject {
    let details = details.filter(|details| !details.is_empty());
    let mut info = JsonObject::new();
    info.insert("message".into(), json!(message));
    info.insert("code".into(), json!(code));
    if let Some(details) = details {
        info.insert("details".into(), json!(details));
    }

    let mut result = JsonObject::new();
    result.insert("success".into(), Value::Bool(false));
    result.insert("error".into(), json!(message));
    result.insert("error_code".into(), json!(code));
    if let Some(details) = details {
        result.insert("error_details".into(), json!(details));
    }
    result.insert("error_info".into(), Value::Object(info));
    result
}
