//! Request handling for the bridge.
//!
//! A connection delivers exactly one JSON envelope:
//!
//! ```json
//! {"type":"ping","params":{},"_mcp":{"request_id":"r-1","response_framing":"len32le"}}
//! ```
//!
//! The [`BridgeConnectionHandler`] reads it, the [`Dispatcher`] marshals the
//! command onto the host's serialized context where the [`CommandRouter`]
//! gates and routes it, and the [`ResponseFramer`] writes back exactly one
//! response:
//!
//! ```json
//! {"success":true,"status":"success","result":{"message":"pong"}}
//! ```

pub mod batch;
mod connection;
mod dispatcher;
mod errors;
mod framing;
mod request;
mod response;
mod router;

pub use self::batch::{BATCH_COMMAND, BatchItem, BatchSummary};
pub use self::connection::{
    BridgeConnectionHandler, MAX_REQUEST_BYTES, READ_CHUNK_BYTES, REQUEST_TIMEOUT,
};
pub use self::dispatcher::Dispatcher;
pub use self::errors::{ConnectionError, ErrorCode, FramingError};
pub use self::framing::{LEN32LE, ResponseFramer, ResponseFraming};
pub use self::request::{CommandEnvelope, META_KEY, RequestMeta};
pub use self::response::{CommandResponse, ErrorInfo, HandlerFailure, ResponseStatus, error_result};
pub use self::router::{CommandRouter, PING_COMMAND};
