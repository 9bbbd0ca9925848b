//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use conduit_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections.
    fn bridge_listening(&self, address: SocketAddr);

    /// Invoked when shutdown begins.
    fn bridge_stopping(&self);

    /// Invoked after the listener and host context have been released.
    fn bridge_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn bridge_listening(&self, address: SocketAddr) {
        (**self).bridge_listening(address);
    }

    fn bridge_stopping(&self) {
        (**self).bridge_stopping();
    }

    fn bridge_stopped(&self) {
        (**self).bridge_stopped();
    }
}

/// Reporter that records lifecycle events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            address = %config.listen_address(),
            read_only = config.read_only,
            token_required = config.security_policy().requires_token(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn bridge_listening(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bridge_listening",
            %address,
            "bridge accepting connections"
        );
    }

    fn bridge_stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bridge_stopping",
            "bridge shutting down"
        );
    }

    fn bridge_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bridge_stopped",
            "bridge stopped"
        );
    }
}
