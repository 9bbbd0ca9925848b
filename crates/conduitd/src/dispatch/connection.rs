//! Connection handler serving one request per accepted connection.
//!
//! The handler accumulates bytes until the buffer parses as a complete
//! envelope, dispatches it, writes the framed response and closes the
//! connection. Connections that time out, close early, exceed the size limit
//! or send an envelope without a `type` are dropped without a response.

use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::host::HostContext;
use crate::transport::ConnectionHandler;

use super::dispatcher::Dispatcher;
use super::errors::ConnectionError;
use super::framing::ResponseFramer;
use super::request::CommandEnvelope;
use super::router::DISPATCH_TARGET;

/// Time allowed for a complete envelope to arrive after acceptance.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Bytes requested per socket read.
pub const READ_CHUNK_BYTES: usize = 8 * 1024;
/// Largest request accepted before the connection is abandoned.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;
/// Upper bound on a single blocking read so shutdown is noticed promptly.
const READ_WAKE_INTERVAL: Duration = Duration::from_millis(50);

/// Connection handler that feeds envelopes to a [`Dispatcher`].
#[derive(Debug)]
pub struct BridgeConnectionHandler<S> {
    dispatcher: Dispatcher<S>,
    timeout: Duration,
}

impl<S> BridgeConnectionHandler<S>
where
    S: HostContext + 'static,
{
    #[must_use]
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self {
            dispatcher,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn serve(&self, mut stream: TcpStream, shutdown: &AtomicBool) {
        let envelope = match self.read_envelope(&mut stream, shutdown) {
            Ok(envelope) => envelope,
            Err(ConnectionError::PeerClosed { received: 0 }) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "abandoning connection");
                return;
            }
        };

        let framing = envelope.framing();
        let (command_type, params) = envelope.into_parts();
        let body = self.dispatcher.execute(&command_type, params);

        if let Err(error) = ResponseFramer::new(&mut stream).write_response(framing, &body) {
            warn!(
                target: DISPATCH_TARGET,
                command = %command_type,
                %error,
                "failed to write response"
            );
        }
    }

    fn read_envelope(
        &self,
        stream: &mut TcpStream,
        shutdown: &AtomicBool,
    ) -> Result<CommandEnvelope, ConnectionError> {
        let deadline = Instant::now() + self.timeout;
        let mut buffer = Vec::new();
        let mut chunk = vec![0_u8; READ_CHUNK_BYTES];

        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Err(ConnectionError::ShuttingDown);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ConnectionError::Timeout {
                    timeout_ms: self.timeout.as_millis(),
                });
            }
            stream.set_read_timeout(Some(remaining.min(READ_WAKE_INTERVAL)))?;

            match stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(ConnectionError::PeerClosed {
                        received: buffer.len(),
                    });
                }
                Ok(read) => {
                    buffer.extend_from_slice(&chunk[..read]);
                    if buffer.len() > MAX_REQUEST_BYTES {
                        return Err(ConnectionError::RequestTooLarge {
                            size: buffer.len(),
                            max_size: MAX_REQUEST_BYTES,
                        });
                    }
                    if let Some(envelope) = CommandEnvelope::try_parse(&buffer)? {
                        return Ok(envelope);
                    }
                }
                Err(error) if is_transient(&error) => {}
                Err(error) => return Err(ConnectionError::Io(error)),
            }
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

impl<S> ConnectionHandler for BridgeConnectionHandler<S>
where
    S: HostContext + 'static,
{
    fn handle(&self, stream: TcpStream, shutdown: &AtomicBool) {
        self.serve(stream, shutdown);
    }
}
