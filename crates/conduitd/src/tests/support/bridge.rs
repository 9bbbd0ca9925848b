//! Live bridge over a loopback socket with a worker-hosted [`TestHost`].

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use conduit_config::{ListenAddress, SecurityPolicy};
use serde_json::Value;

use crate::bridge::Bridge;
use crate::dispatch::{CommandRouter, REQUEST_TIMEOUT};
use crate::host::{CapabilityRegistry, HostHandle, SharedSecurity, WorkerHandle, work_queue};

use super::host::{ScriptedGroup, TestHost, test_registry};

const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Bytes returned by the bridge for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub bytes: Vec<u8>,
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parses the reply as a raw JSON document.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).expect("reply is JSON")
    }

    /// Splits a `len32le` reply into its declared length and body.
    pub fn framed(&self) -> (u32, &[u8]) {
        assert!(self.bytes.len() >= 4, "framed reply shorter than prefix");
        let (prefix, body) = self.bytes.split_at(4);
        let length = u32::from_le_bytes(prefix.try_into().expect("four byte prefix"));
        (length, body)
    }
}

/// A bridge bound to an ephemeral loopback port.
pub struct BridgeHarness {
    bridge: Option<Bridge>,
    host: Option<HostHandle<TestHost>>,
    worker: Option<WorkerHandle<TestHost>>,
    security: SharedSecurity,
    group: ScriptedGroup,
    addr: SocketAddr,
}

impl BridgeHarness {
    /// Starts an interactive bridge with an open security policy.
    pub fn start() -> Self {
        Self::start_with(TestHost::interactive(), SecurityPolicy::default(), REQUEST_TIMEOUT)
    }

    pub fn start_with(host: TestHost, policy: SecurityPolicy, timeout: Duration) -> Self {
        let group = ScriptedGroup::new();
        let registry = test_registry(group.clone());
        Self::start_with_registry(host, policy, timeout, registry, group)
    }

    fn start_with_registry(
        host: TestHost,
        policy: SecurityPolicy,
        timeout: Duration,
        registry: CapabilityRegistry<TestHost>,
        group: ScriptedGroup,
    ) -> Self {
        let security = SharedSecurity::new(policy);
        let router = CommandRouter::new(registry, Arc::new(security.clone()));
        let (handle, queue) = work_queue::<TestHost>();
        let worker = queue.spawn(host).expect("spawn host worker");
        let bridge = Bridge::serve_with_timeout(
            &ListenAddress::new("127.0.0.1", 0),
            router,
            handle.clone(),
            timeout,
        )
        .expect("bridge binds loopback");
        let addr = bridge.local_addr();
        Self {
            bridge: Some(bridge),
            host: Some(handle),
            worker: Some(worker),
            security,
            group,
            addr,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn security(&self) -> &SharedSecurity {
        &self.security
    }

    /// Command types the scripted handlers have seen.
    pub fn handler_calls(&self) -> Vec<String> {
        self.group.calls()
    }

    /// Reads the host counter through the serialized context.
    pub fn counter(&self) -> u64 {
        self.host
            .as_ref()
            .expect("host handle available")
            .call(|host| host.counter)
            .expect("host context running")
    }

    pub fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect to bridge");
        stream
            .set_read_timeout(Some(CLIENT_READ_TIMEOUT))
            .expect("set client read timeout");
        stream
    }

    /// Sends `request` in one write and reads until the bridge closes.
    pub fn send(&self, request: &[u8]) -> Reply {
        let mut stream = self.connect();
        stream.write_all(request).expect("write request");
        stream.flush().expect("flush request");
        read_reply(&mut stream)
    }

    /// Sends a JSON document and reads the reply.
    pub fn send_json(&self, request: &Value) -> Reply {
        self.send(request.to_string().as_bytes())
    }

    /// Sends `request` split into `pieces` writes with a pause between each.
    pub fn send_in_pieces(&self, request: &[u8], pieces: usize) -> Reply {
        let mut stream = self.connect();
        let chunk = request.len().div_ceil(pieces.max(1)).max(1);
        for part in request.chunks(chunk) {
            stream.write_all(part).expect("write request piece");
            stream.flush().expect("flush request piece");
            thread::sleep(Duration::from_millis(20));
        }
        read_reply(&mut stream)
    }

    /// Sends `request` then half-closes the write side.
    pub fn send_and_close(&self, request: &[u8]) -> Reply {
        let mut stream = self.connect();
        stream.write_all(request).expect("write request");
        stream.shutdown(Shutdown::Write).expect("half-close");
        read_reply(&mut stream)
    }
}

fn read_reply(stream: &mut TcpStream) -> Reply {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).expect("read reply");
    Reply { bytes }
}

impl Drop for BridgeHarness {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            let _ = bridge.stop();
        }
        self.host.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
