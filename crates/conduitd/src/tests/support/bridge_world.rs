//! Shared world for the bridge and batch behaviour suites.

use std::cell::RefCell;
use std::time::Duration;

use conduit_config::SecurityPolicy;
use rstest::fixture;
use serde_json::Value;

use crate::dispatch::REQUEST_TIMEOUT;

use super::bridge::{BridgeHarness, Reply};
use super::host::TestHost;

/// Scenario state: one bridge and the last reply it sent.
#[derive(Default)]
pub struct BridgeWorld {
    bridge: Option<BridgeHarness>,
    reply: Option<Reply>,
}

impl BridgeWorld {
    pub fn start(&mut self, host: TestHost, policy: SecurityPolicy, timeout: Duration) {
        self.bridge = Some(BridgeHarness::start_with(host, policy, timeout));
    }

    pub fn start_default(&mut self, policy: SecurityPolicy) {
        self.start(TestHost::interactive(), policy, REQUEST_TIMEOUT);
    }

    pub fn bridge(&self) -> &BridgeHarness {
        self.bridge.as_ref().expect("bridge started")
    }

    pub fn send_json(&mut self, request: &Value) {
        let reply = self.bridge().send_json(request);
        self.reply = Some(reply);
    }

    pub fn record(&mut self, reply: Reply) {
        self.reply = Some(reply);
    }

    pub fn reply(&self) -> &Reply {
        self.reply.as_ref().expect("request sent")
    }

    /// Last reply parsed as a raw JSON document.
    pub fn body(&self) -> Value {
        self.reply().json()
    }
}

#[fixture]
pub fn world() -> RefCell<BridgeWorld> {
    RefCell::new(BridgeWorld::default())
}
