//! TCP listener for the bridge.
//!
//! The listener binds the configured address and runs an accept loop on a
//! background thread. Each accepted connection is tuned and handed to the
//! [`ConnectionHandler`] synchronously, so connections are served strictly
//! one at a time.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::ConnectionHandler;
pub use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, SlowHandler};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
