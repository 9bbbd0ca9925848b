//! Security settings consulted on every dispatched request.
//!
//! The bridge never caches the policy: the router calls
//! [`SecuritySettings::current`] once at the start of each unit of work, so
//! a host that flips read-only mode or rotates the shared token sees the
//! change on the very next request.

use std::sync::{Arc, PoisonError, RwLock};

use conduit_config::SecurityPolicy;
use tracing::info;

use super::HOST_TARGET;

/// Source of the current security policy.
#[cfg_attr(test, mockall::automock)]
pub trait SecuritySettings: Send + Sync {
    /// Returns the policy in force right now.
    fn current(&self) -> SecurityPolicy;
}

impl SecuritySettings for SecurityPolicy {
    fn current(&self) -> SecurityPolicy {
        self.clone()
    }
}

/// Shared, runtime-adjustable security policy.
#[derive(Debug, Clone, Default)]
pub struct SharedSecurity {
    inner: Arc<RwLock<SecurityPolicy>>,
}

impl SharedSecurity {
    /// Wraps an initial policy.
    #[must_use]
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(policy)),
        }
    }

    /// Replaces the whole policy.
    pub fn replace(&self, policy: SecurityPolicy) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = policy;
        info!(
            target: HOST_TARGET,
            read_only = guard.read_only,
            token_required = guard.requires_token(),
            "security policy replaced"
        );
    }

    /// Toggles read-only mode.
    pub fn set_read_only(&self, read_only: bool) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.read_only = read_only;
        info!(target: HOST_TARGET, read_only, "read-only mode updated");
    }

    /// Rotates the shared secret. An empty token disables enforcement.
    pub fn set_token(&self, token: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.security_token = token.into();
        info!(
            target: HOST_TARGET,
            token_required = guard.requires_token(),
            "security token updated"
        );
    }
}

impl SecuritySettings for SharedSecurity {
    fn current(&self) -> SecurityPolicy {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
