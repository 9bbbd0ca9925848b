//! Bridge lifecycle: bind, serve and stop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use conduit_config::ListenAddress;

use crate::dispatch::{BridgeConnectionHandler, CommandRouter, Dispatcher, REQUEST_TIMEOUT};
use crate::host::{HostContext, HostHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// A running bridge.
///
/// Dropping a bridge signals the accept loop to stop without waiting for
/// it; call [`Bridge::stop`] for an orderly shutdown.
#[derive(Debug)]
pub struct Bridge {
    listener: ListenerHandle,
}

impl Bridge {
    /// Binds `address` and serves commands through `router` on the host
    /// context behind `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the address cannot be bound.
    pub fn serve<S>(
        address: &ListenAddress,
        router: CommandRouter<S>,
        host: HostHandle<S>,
    ) -> Result<Self, ListenerError>
    where
        S: HostContext + 'static,
    {
        Self::serve_with_timeout(address, router, host, REQUEST_TIMEOUT)
    }

    /// Like [`Bridge::serve`] with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the address cannot be bound.
    pub fn serve_with_timeout<S>(
        address: &ListenAddress,
        router: CommandRouter<S>,
        host: HostHandle<S>,
        timeout: Duration,
    ) -> Result<Self, ListenerError>
    where
        S: HostContext + 'static,
    {
        let handler =
            BridgeConnectionHandler::new(Dispatcher::new(router, host)).with_timeout(timeout);
        Self::start(address, handler)
    }

    /// Binds `address` and serves connections with `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the address cannot be bound.
    pub fn start<S>(
        address: &ListenAddress,
        handler: BridgeConnectionHandler<S>,
    ) -> Result<Self, ListenerError>
    where
        S: HostContext + 'static,
    {
        let listener = SocketListener::bind(address)?.start(Arc::new(handler))?;
        Ok(Self { listener })
    }

    /// Address the bridge listens on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Stops accepting, waits for the accept thread, then releases the
    /// connection handler and the listening socket in that order.
    ///
    /// The handler owns the bridge's [`HostHandle`], so once this returns
    /// the host's work queue no longer hears from the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the accept thread panicked.
    pub fn stop(self) -> Result<(), ListenerError> {
        self.listener.shutdown();
        self.listener.join()
    }
}
