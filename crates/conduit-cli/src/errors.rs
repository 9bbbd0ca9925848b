//! Error types for the controller client and CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Failures talking to a bridge.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The bridge address did not resolve.
    #[error("failed to resolve bridge address {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },
    /// No connection could be established.
    #[error("failed to connect to bridge at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    /// The request envelope could not be encoded.
    #[error("failed to serialise request: {0}")]
    Serialise(#[source] serde_json::Error),
    /// Writing the request failed.
    #[error("failed to send request to bridge: {0}")]
    Send(#[source] io::Error),
    /// Reading the response failed.
    #[error("failed to read response from bridge: {0}")]
    Receive(#[source] io::Error),
    /// The bridge closed the connection without answering.
    #[error("bridge closed the connection without a response")]
    NoResponse,
    /// A framed response declared a body above the client limit.
    #[error("response of {size} bytes exceeds the {max_size} byte limit")]
    ResponseTooLarge { size: usize, max_size: usize },
    /// The response body was not a JSON document.
    #[error("bridge sent an invalid response: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

impl ClientError {
    /// Returns true when the bridge does not appear to be listening.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("command parameters must be a JSON object: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write response: {0}")]
    ForwardResponse(#[source] io::Error),
}
