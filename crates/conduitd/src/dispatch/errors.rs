//! Error taxonomy for the bridge.
//!
//! [`ErrorCode`] names the machine-readable codes the bridge itself puts on
//! the wire. [`ConnectionError`] and [`FramingError`] describe local failures
//! that happen before a request has been parsed or while a response is being
//! written; those are logged and never reach the client.

use std::io;

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Error codes produced by the bridge core.
///
/// Handler groups may return their own codes; those pass through as plain
/// strings and never need to appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The host is not in an interactive, editable state.
    EditorOnly,
    /// The shared secret was missing or wrong.
    Unauthorized,
    /// A mutating command arrived while read-only mode is on.
    ReadOnly,
    /// The request parameters were structurally invalid.
    BadRequest,
    /// No handler group serves the command type.
    UnknownCommand,
    /// At least one batch item failed.
    Batch,
    /// A handler or the dispatch body faulted.
    Exception,
    /// A failing handler result carried no code of its own.
    Generic,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Local failures while reading a request from a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No complete envelope arrived before the deadline.
    #[error("no complete request within {timeout_ms} ms")]
    Timeout { timeout_ms: u128 },
    /// The peer closed the connection before a complete envelope arrived.
    #[error("peer closed the connection after {received} bytes")]
    PeerClosed { received: usize },
    /// The accumulated request exceeded the size limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },
    /// The envelope parsed but carried no string `type` field.
    #[error("request envelope is missing a string 'type' field")]
    MissingType,
    /// The listener is shutting down.
    #[error("listener is shutting down")]
    ShuttingDown,
    /// Socket-level failure.
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failures while writing a framed response.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The body cannot be described by a 32-bit length prefix.
    #[error("response body of {size} bytes does not fit a 32-bit length prefix")]
    BodyTooLarge { size: usize },
    /// The peer stopped accepting bytes.
    #[error("peer accepted no bytes while writing the response")]
    WriteZero,
    /// Socket-level failure.
    #[error("response write failed: {0}")]
    Io(#[from] io::Error),
}
