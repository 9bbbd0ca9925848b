//! Test harness utilities for the bridge behavioural suites.

mod bridge;
mod bridge_world;
mod host;
mod reporter;
mod shutdown;

pub use bridge::{BridgeHarness, Reply};
pub use bridge_world::{BridgeWorld, world};
pub use host::{MockGroup, TestHost};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::{ShutdownTrigger, TestShutdownSignal};

/// Removes surrounding double quotes captured by step placeholders.
pub fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}
