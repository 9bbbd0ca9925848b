//! TCP listener serving one connection at a time.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use conduit_config::ListenAddress;

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const LISTENER_THREAD_NAME: &str = "conduit-listener";
#[cfg(unix)]
const SOCKET_BUFFER_BYTES: usize = 64 * 1024;

/// Bound listening socket.
#[derive(Debug)]
pub struct SocketListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    /// Resolves and binds `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when resolution or binding fails.
    pub fn bind(address: &ListenAddress) -> Result<Self, ListenerError> {
        let listener = bind_tcp(&address.host, address.port)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the socket is bound to, with any ephemeral port resolved.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the accept loop on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the socket cannot be made non-blocking
    /// or the thread cannot be spawned.
    pub fn start(self, handler: Arc<dyn ConnectionHandler>) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let local_addr = self.local_addr;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(LISTENER_THREAD_NAME.to_string())
            .spawn(move || {
                run_accept_loop(&self, &shutdown_flag, &*handler);
                (self, handler)
            })
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            local_addr,
            handle: Some(handle),
        })
    }
}

type AcceptThread = thread::JoinHandle<(SocketListener, Arc<dyn ConnectionHandler>)>;

/// Handle to the background accept loop.
///
/// The loop thread hands the listening socket and the connection handler
/// back when it exits, so [`ListenerHandle::join`] can release them after
/// the thread is gone: handler first, socket last.
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    local_addr: SocketAddr,
    handle: Option<AcceptThread>,
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("local_addr", &self.local_addr)
            .field("stopping", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ListenerHandle {
    /// Asks the accept loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the accept loop to exit, then releases its resources.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the loop thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let (listener, handler) = handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        drop(handler);
        drop(listener);
        info!(
            target: LISTENER_TARGET,
            address = %self.local_addr,
            "listener stopped"
        );
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(listener: &SocketListener, shutdown: &AtomicBool, handler: &dyn ConnectionHandler) {
    info!(
        target: LISTENER_TARGET,
        address = %listener.local_addr,
        "listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match listener.listener.accept() {
            Ok((stream, peer)) => {
                last_error = None;
                if let Err(error) = stream.set_nonblocking(false) {
                    warn!(
                        target: LISTENER_TARGET,
                        %peer,
                        %error,
                        "failed to switch connection to blocking mode"
                    );
                    continue;
                }
                tune_stream(&stream);
                debug!(target: LISTENER_TARGET, %peer, "connection accepted");
                serve_connection(handler, stream, shutdown);
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        %error,
                        "accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

fn serve_connection(handler: &dyn ConnectionHandler, stream: TcpStream, shutdown: &AtomicBool) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(stream, shutdown)));
    if outcome.is_err() {
        error!(target: LISTENER_TARGET, "connection handler panicked");
    }
}

fn tune_stream(stream: &TcpStream) {
    if let Err(error) = stream.set_nodelay(true) {
        warn!(target: LISTENER_TARGET, %error, "failed to disable send coalescing");
    }
    #[cfg(unix)]
    set_buffer_sizes(stream);
}

#[cfg(unix)]
fn set_buffer_sizes(stream: &TcpStream) {
    use nix::sys::socket::{setsockopt, sockopt};

    if let Err(errno) = setsockopt(stream, sockopt::SndBuf, &SOCKET_BUFFER_BYTES) {
        warn!(target: LISTENER_TARGET, error = %errno, "failed to size send buffer");
    }
    if let Err(errno) = setsockopt(stream, sockopt::RcvBuf, &SOCKET_BUFFER_BYTES) {
        warn!(target: LISTENER_TARGET, error = %errno, "failed to size receive buffer");
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_string(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })
}
