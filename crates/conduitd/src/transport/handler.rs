//! Connection handling abstraction for the listener.

use std::net::TcpStream;
use std::sync::atomic::AtomicBool;

/// Handles accepted connections.
///
/// The listener calls [`ConnectionHandler::handle`] on its own thread and
/// does not accept another connection until it returns. `shutdown` flips to
/// `true` once the listener has been asked to stop; long waits should poll
/// it and give up.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream, shutdown: &AtomicBool);
}
