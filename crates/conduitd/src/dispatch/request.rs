//! Request envelope parsing.
//!
//! Requests carry no length prefix. The connection handler re-parses its
//! accumulated buffer after every read and treats a parse failure as "not
//! complete yet", so a single JSON object per connection is the whole
//! protocol:
//!
//! ```json
//! {"type":"spawn_actor","params":{"name":"Cube"},"_mcp":{"request_id":"r-1","token":"s3cret","response_framing":"len32le"}}
//! ```

use serde_json::Value;

use crate::host::JsonObject;

use super::errors::ConnectionError;
use super::framing::ResponseFraming;

/// Reserved key carrying request metadata, both on the envelope and inside
/// the params handed to handlers.
pub const META_KEY: &str = "_mcp";

/// Optional per-request metadata.
///
/// Fields that are absent or not strings are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    request_id: Option<String>,
    trace_id: Option<String>,
    token: Option<String>,
    response_framing: Option<String>,
}

impl RequestMeta {
    /// Extracts metadata from a `_mcp` object.
    #[must_use]
    pub fn from_object(object: &JsonObject) -> Self {
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            request_id: text("request_id"),
            trace_id: text("trace_id"),
            token: text("token"),
            response_framing: text("response_framing"),
        }
    }

    /// Extracts metadata merged into a params object under [`META_KEY`].
    #[must_use]
    pub fn from_params(params: &JsonObject) -> Self {
        params
            .get(META_KEY)
            .and_then(Value::as_object)
            .map(Self::from_object)
            .unwrap_or_default()
    }

    /// Client-supplied request identifier.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Client-supplied trace identifier.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Shared secret presented by the client.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Requested response framing, verbatim.
    #[must_use]
    pub fn response_framing(&self) -> Option<&str> {
        self.response_framing.as_deref()
    }
}

/// One parsed request.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    command_type: String,
    params: JsonObject,
    meta: RequestMeta,
}

impl CommandEnvelope {
    /// Attempts to parse an accumulated request buffer.
    ///
    /// Returns `Ok(None)` while the buffer does not yet hold a complete JSON
    /// object. Once it does, `params` defaults to an empty object and the
    /// envelope's `_mcp` block is copied into `params` under [`META_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::MissingType`] when a complete object has
    /// no string `type` field.
    pub fn try_parse(buffer: &[u8]) -> Result<Option<Self>, ConnectionError> {
        let Ok(Value::Object(mut envelope)) = serde_json::from_slice::<Value>(buffer) else {
            return Ok(None);
        };

        let command_type = match envelope.remove("type") {
            Some(Value::String(command_type)) => command_type,
            _ => return Err(ConnectionError::MissingType),
        };

        let mut params = match envelope.remove("params") {
            Some(Value::Object(params)) => params,
            _ => JsonObject::new(),
        };

        let meta = match envelope.remove(META_KEY) {
            Some(Value::Object(meta)) => {
                let parsed = RequestMeta::from_object(&meta);
                params.insert(META_KEY.to_string(), Value::Object(meta));
                parsed
            }
            _ => RequestMeta::default(),
        };

        Ok(Some(Self {
            command_type,
            params,
            meta,
        }))
    }

    /// Command type string.
    #[must_use]
    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    /// Parameters after metadata merging.
    #[must_use]
    pub fn params(&self) -> &JsonObject {
        &self.params
    }

    /// Metadata from the envelope itself.
    #[must_use]
    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Framing requested for the response to this envelope.
    #[must_use]
    pub fn framing(&self) -> ResponseFraming {
        ResponseFraming::from_meta(&self.meta)
    }

    /// Splits the envelope into its command type and params.
    #[must_use]
    pub fn into_parts(self) -> (String, JsonObject) {
        (self.command_type, self.params)
    }
}
