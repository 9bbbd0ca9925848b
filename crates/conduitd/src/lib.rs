//! Control-plane bridge between an external controller and a host
//! application.
//!
//! A controller opens a TCP connection, sends one JSON command envelope and
//! receives one JSON response. Commands never touch host state from the I/O
//! thread: the [`Dispatcher`] marshals each one onto the host's serialized
//! execution context (see [`host::executor`]) and blocks until it has run.
//!
//! Inside that context the [`CommandRouter`] applies three gates in order
//! (interactive context, shared-secret token, read-only mode), then routes
//! the command to the built-in `ping`, the [batch protocol](dispatch::batch)
//! or a handler group in the [`CapabilityRegistry`]. Every failure after a
//! request has been parsed comes back as a structured response; failures
//! before that point are logged and the connection is simply closed.
//!
//! Embedding the bridge in a host:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use conduit_config::{ListenAddress, SecurityPolicy};
//! use conduitd::{Bridge, CommandRouter, SharedSecurity, scene, work_queue};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let security = SharedSecurity::new(SecurityPolicy::default());
//! let router = CommandRouter::new(scene::registry()?, Arc::new(security.clone()));
//! let (handle, queue) = work_queue();
//! let bridge = Bridge::serve(&ListenAddress::new("127.0.0.1", 55557), router, handle)?;
//!
//! let mut level = scene::SceneHost::new();
//! loop {
//!     // Once per host tick.
//!     queue.run_pending(&mut level);
//!     # break;
//! }
//! bridge.stop()?;
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod bridge;
pub mod dispatch;
mod health;
pub mod host;
mod process;
pub mod scene;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, Bootstrapped, ConfigLoader, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use bridge::Bridge;
pub use dispatch::{
    BridgeConnectionHandler, CommandResponse, CommandRouter, Dispatcher, ErrorCode,
    ResponseFraming,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use host::{
    CapabilityRegistry, CommandFault, CommandGroup, HostContext, HostHandle, JsonObject,
    SecuritySettings, SharedSecurity, WorkQueue, work_queue,
};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_bridge,
    run_bridge_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionHandler, ListenerError};

#[cfg(test)]
mod tests;
