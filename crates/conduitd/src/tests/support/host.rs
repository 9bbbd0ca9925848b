//! Host state and handler groups used across the suites.

use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::dispatch::error_result;
use crate::host::{CapabilityRegistry, CommandFault, CommandGroup, HostContext, JsonObject};

/// Command types served by [`ScriptedGroup`].
///
/// Names starting with a mutating prefix exercise the read-only gate.
pub const TEST_COMMANDS: &[&str] = &[
    "echo",
    "get_state",
    "bump",
    "create_widget",
    "set_value",
    "delete_item",
    "spawn_thing",
    "add_part",
    "import_asset",
    "reimport_asset",
    "fail_one",
    "fail_with_info",
    "fault",
    "explode",
];

/// Minimal host state with an interactive switch and a counter.
#[derive(Debug, Default)]
pub struct TestHost {
    pub interactive: bool,
    pub counter: u64,
}

impl TestHost {
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            counter: 0,
        }
    }
}

impl HostContext for TestHost {
    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

mockall::mock! {
    pub Group {}

    impl CommandGroup<TestHost> for Group {
        fn handle_command(
            &self,
            host: &mut TestHost,
            command_type: &str,
            params: &JsonObject,
        ) -> Result<JsonObject, CommandFault>;
    }
}

/// Handler group whose behaviour is selected by the command type.
///
/// Every call is recorded so scenarios can assert whether a handler ran.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGroup {
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command types handled so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object literal, got {other}"),
    }
}

impl CommandGroup<TestHost> for ScriptedGroup {
    fn handle_command(
        &self,
        host: &mut TestHost,
        command_type: &str,
        params: &JsonObject,
    ) -> Result<JsonObject, CommandFault> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(command_type.to_owned());

        match command_type {
            "bump" => {
                host.counter += 1;
                Ok(object(json!({ "counter": host.counter })))
            }
            "get_state" => Ok(object(json!({ "counter": host.counter }))),
            "fail_one" => Ok(error_result("HANDLER_FAILED", "fail_one failed", None)),
            "fail_with_info" => Ok(object(json!({
                "success": false,
                "error": "rich failure",
                "error_code": "RICH",
                "error_info": { "message": "rich failure", "code": "RICH", "hint": 7 },
            }))),
            "fault" => Err(CommandFault::new("handler fault")),
            "explode" => panic!("handler exploded"),
            other => Ok(object(json!({ "command": other, "params": params }))),
        }
    }
}

/// Registry that routes every [`TEST_COMMANDS`] entry to `group`.
pub fn test_registry(group: ScriptedGroup) -> CapabilityRegistry<TestHost> {
    CapabilityRegistry::builder()
        .group(TEST_COMMANDS, group)
        .build()
        .expect("test registry builds")
}
