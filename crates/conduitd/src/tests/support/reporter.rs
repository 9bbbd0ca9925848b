//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::Mutex;

use conduit_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    BridgeListening(SocketAddr),
    BridgeStopping,
    BridgeStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address reported by the most recent listening event.
    pub fn listening_addr(&self) -> Option<SocketAddr> {
        self.events().into_iter().rev().find_map(|event| match event {
            HealthEvent::BridgeListening(addr) => Some(addr),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn bridge_listening(&self, address: SocketAddr) {
        self.record(HealthEvent::BridgeListening(address));
    }

    fn bridge_stopping(&self) {
        self.record(HealthEvent::BridgeStopping);
    }

    fn bridge_stopped(&self) {
        self.record(HealthEvent::BridgeStopped);
    }
}
