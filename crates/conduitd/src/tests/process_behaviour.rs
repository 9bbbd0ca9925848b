//! Behavioural tests covering the daemon launch and shutdown sequence.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use conduit_config::Config;
use ortho_config::OrthoError;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::bootstrap::ConfigLoader;
use crate::process::{LaunchError, LaunchPlan, run_bridge_with};
use crate::tests::support::{
    HealthEvent, RecordingHealthReporter, ShutdownTrigger, TestShutdownSignal, strip_quotes,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type StepResult = Result<(), String>;

/// Loader switching between a fixed configuration and a parse failure.
#[derive(Clone)]
enum TestConfigLoader {
    Static(Config),
    Invalid,
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        match self {
            Self::Static(config) => Ok(config.clone()),
            Self::Invalid => Config::load_from_iter([
                OsString::from("conduitd"),
                OsString::from("--port"),
                OsString::from("not-a-port"),
            ]),
        }
    }
}

struct ProcessWorld {
    loader: Option<TestConfigLoader>,
    reporter: Arc<RecordingHealthReporter>,
    trigger: Option<ShutdownTrigger>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
    addr: Option<SocketAddr>,
}

impl ProcessWorld {
    fn new() -> Self {
        Self {
            loader: None,
            reporter: Arc::new(RecordingHealthReporter::default()),
            trigger: None,
            handle: None,
            result: None,
            addr: None,
        }
    }

    fn configure(&mut self, token: &str) {
        self.loader = Some(TestConfigLoader::Static(Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            security_token: token.to_string(),
            ..Config::default()
        }));
    }

    fn start(&mut self) -> StepResult {
        let loader = self.loader.clone().ok_or("no configuration loader")?;
        let (shutdown, trigger) = TestShutdownSignal::new();
        let reporter = Arc::clone(&self.reporter) as Arc<dyn crate::health::HealthReporter>;
        self.trigger = Some(trigger);
        self.handle = Some(thread::spawn(move || {
            run_bridge_with(LaunchPlan {
                loader,
                reporter,
                shutdown,
            })
        }));
        Ok(())
    }

    fn wait_for_listening(&mut self) -> Result<SocketAddr, String> {
        if let Some(addr) = self.addr {
            return Ok(addr);
        }
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Some(addr) = self.reporter.listening_addr() {
                self.addr = Some(addr);
                return Ok(addr);
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(format!(
            "daemon never reported listening: {:?}",
            self.reporter.events()
        ))
    }

    fn request(&mut self, request: &Value) -> Result<Value, String> {
        let addr = self.wait_for_listening()?;
        let mut stream = TcpStream::connect(addr).map_err(|error| error.to_string())?;
        stream
            .set_read_timeout(Some(WAIT_TIMEOUT))
            .map_err(|error| error.to_string())?;
        stream
            .write_all(request.to_string().as_bytes())
            .map_err(|error| error.to_string())?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|error| error.to_string())?;
        serde_json::from_slice(&bytes).map_err(|error| error.to_string())
    }

    fn trigger_shutdown(&self) {
        if let Some(trigger) = &self.trigger {
            trigger.fire();
        }
    }

    fn join(&mut self) -> StepResult {
        let handle = self.handle.take().ok_or("daemon was not started")?;
        let result = handle
            .join()
            .map_err(|_| "daemon thread panicked".to_string())?;
        self.result = Some(result);
        Ok(())
    }
}

impl Drop for ProcessWorld {
    fn drop(&mut self) {
        self.trigger_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[fixture]
fn world() -> RefCell<ProcessWorld> {
    RefCell::new(ProcessWorld::new())
}

#[given("a daemon configured on an ephemeral port")]
fn given_ephemeral_daemon(world: &RefCell<ProcessWorld>) {
    world.borrow_mut().configure("");
}

#[given(r#"a daemon configured on an ephemeral port with token "{token}""#)]
fn given_token_daemon(world: &RefCell<ProcessWorld>, token: String) {
    world.borrow_mut().configure(strip_quotes(&token));
}

#[given("a daemon with an invalid configuration")]
fn given_invalid_daemon(world: &RefCell<ProcessWorld>) {
    world.borrow_mut().loader = Some(TestConfigLoader::Invalid);
}

#[when("the daemon starts")]
fn when_daemon_starts(world: &RefCell<ProcessWorld>) -> StepResult {
    world.borrow_mut().start()
}

#[when("shutdown is triggered")]
fn when_shutdown_triggered(world: &RefCell<ProcessWorld>) {
    world.borrow().trigger_shutdown();
}

#[when("the daemon run completes")]
fn when_daemon_completes(world: &RefCell<ProcessWorld>) -> StepResult {
    world.borrow_mut().join()
}

#[then("the daemon answers ping")]
fn then_daemon_answers_ping(world: &RefCell<ProcessWorld>) -> StepResult {
    let body = world.borrow_mut().request(&json!({ "type": "ping" }))?;
    assert_eq!(body["result"]["message"], "pong");
    Ok(())
}

#[then("spawning an actor without the token is unauthorized")]
fn then_spawn_unauthorized(world: &RefCell<ProcessWorld>) -> StepResult {
    let body = world.borrow_mut().request(&json!({
        "type": "spawn_actor",
        "params": { "name": "Cube", "type": "StaticMeshActor" },
    }))?;
    assert_eq!(body["error_code"], "UNAUTHORIZED");
    Ok(())
}

#[then(r#"spawning an actor with token "{token}" succeeds"#)]
fn then_spawn_with_token(world: &RefCell<ProcessWorld>, token: String) -> StepResult {
    let body = world.borrow_mut().request(&json!({
        "type": "spawn_actor",
        "params": { "name": "Cube", "type": "StaticMeshActor" },
        "_mcp": { "token": strip_quotes(&token) },
    }))?;
    assert_eq!(body["success"], true, "unexpected response: {body}");
    Ok(())
}

#[then("the daemon run succeeds")]
fn then_daemon_succeeds(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon result recorded");
    assert!(result.is_ok(), "daemon run should succeed: {result:?}");
}

#[then("the daemon run fails during bootstrap")]
fn then_daemon_fails(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon result recorded");
    assert!(
        matches!(result, Err(LaunchError::Bootstrap(_))),
        "unexpected result: {result:?}"
    );
}

#[then("the lifecycle events were reported in order")]
fn then_lifecycle_order(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let addr = world.addr.expect("listening address observed");
    assert_eq!(
        world.reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::BootstrapSucceeded,
            HealthEvent::BridgeListening(addr),
            HealthEvent::BridgeStopping,
            HealthEvent::BridgeStopped,
        ]
    );
}

#[then("the bootstrap failure was reported")]
fn then_bootstrap_failure_reported(world: &RefCell<ProcessWorld>) {
    let events = world.borrow().reporter.events();
    assert!(matches!(events.first(), Some(HealthEvent::BootstrapStarting)));
    assert!(
        matches!(events.last(), Some(HealthEvent::BootstrapFailed(_))),
        "unexpected events: {events:?}"
    );
}

#[then("the listening port is released")]
fn then_port_released(world: &RefCell<ProcessWorld>) {
    let addr = world.borrow().addr.expect("listening address observed");
    TcpListener::bind(addr).expect("port should be free after shutdown");
}

#[scenario(
    path = "tests/features/process_lifecycle.feature",
    name = "The daemon serves until shutdown"
)]
fn daemon_serves_until_shutdown(#[from(world)] world: RefCell<ProcessWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/process_lifecycle.feature",
    name = "The daemon enforces the configured token"
)]
fn daemon_enforces_token(#[from(world)] world: RefCell<ProcessWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/process_lifecycle.feature",
    name = "Invalid configuration aborts startup"
)]
fn invalid_configuration_aborts(#[from(world)] world: RefCell<ProcessWorld>) {
    drop(world);
}
