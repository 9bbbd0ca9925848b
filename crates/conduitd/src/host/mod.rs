//! Host-side collaborators for the bridge.
//!
//! The host owns a single piece of mutable state and a serialized execution
//! context that is the only place allowed to touch it. This module provides
//! the work queue that funnels bridge commands into that context, the
//! capability registry that routes command types to handler groups, and the
//! security settings provider consulted on every dispatched request.

pub mod executor;
pub mod registry;
pub mod security;

pub use self::executor::{ExecutorError, HostHandle, WorkQueue, WorkerHandle, work_queue};
pub use self::registry::{
    CapabilityRegistry, CommandFault, CommandGroup, JsonObject, RegistryBuilder, RegistryError,
};
pub use self::security::{SecuritySettings, SharedSecurity};

pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// Host state that can report whether commands may run right now.
///
/// The context gate consults this before any other check. A host that is
/// mid-simulation or otherwise not editable should return `false`.
pub trait HostContext {
    /// Returns `true` when the host accepts bridge commands.
    fn is_interactive(&self) -> bool;
}
