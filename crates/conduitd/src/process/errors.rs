//! Unified error surface for daemon launch and supervision.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::host::{ExecutorError, RegistryError};
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration or telemetry setup failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The command table could not be assembled.
    #[error("failed to build capability registry: {0}")]
    Registry(#[from] RegistryError),
    /// The host worker could not be started or crashed.
    #[error("host execution context failed: {0}")]
    Executor(#[from] ExecutorError),
    /// Binding or running the listener failed.
    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),
    /// Waiting for a shutdown signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
