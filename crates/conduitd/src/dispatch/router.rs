//! Gating and command routing inside the serialized host context.
//!
//! Gates run in a fixed order before any handler is touched:
//!
//! 1. context: the host must report itself interactive (`EDITOR_ONLY`);
//! 2. token: a configured secret must match `_mcp.token` exactly
//!    (`UNAUTHORIZED`);
//! 3. read-only: mutating command names are refused (`READ_ONLY`).
//!
//! Requests that pass are routed to the batch protocol, the built-in `ping`,
//! or the capability registry. Handler faults and panics become `EXCEPTION`
//! results and never escape the router.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use conduit_config::is_mutating;
use serde_json::json;
use tracing::debug;

use crate::host::executor::panic_message;
use crate::host::{CapabilityRegistry, HostContext, JsonObject, SecuritySettings};

use super::batch::{self, BATCH_COMMAND};
use super::errors::ErrorCode;
use super::request::RequestMeta;
use super::response::{CommandResponse, error_result};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Built-in liveness command.
pub const PING_COMMAND: &str = "ping";

const EDITOR_ONLY_MESSAGE: &str = "Bridge commands require an interactive host context";
const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const UNAUTHORIZED_DETAILS: &str = "Missing or invalid security token";
const READ_ONLY_MESSAGE: &str = "Server is in read-only mode";
const READ_ONLY_DETAILS: &str = "Disable read-only mode to run mutating commands";
const PANIC_DETAILS: &str = "panic";

/// Routes gated commands to handler groups.
pub struct CommandRouter<S> {
    registry: CapabilityRegistry<S>,
    security: Arc<dyn SecuritySettings>,
}

impl<S> std::fmt::Debug for CommandRouter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<S: HostContext> CommandRouter<S> {
    /// Creates a router over a frozen registry.
    #[must_use]
    pub fn new(registry: CapabilityRegistry<S>, security: Arc<dyn SecuritySettings>) -> Self {
        Self { registry, security }
    }

    /// Gates, routes and assembles the response for one request.
    ///
    /// Must be called from the serialized host context. Never panics.
    pub fn dispatch(&self, host: &mut S, command_type: &str, params: &JsonObject) -> CommandResponse {
        panic::catch_unwind(AssertUnwindSafe(|| self.gate_and_route(host, command_type, params)))
            .unwrap_or_else(|payload| {
                CommandResponse::from_error(
                    ErrorCode::Exception,
                    panic_message(payload.as_ref()),
                    Some(PANIC_DETAILS),
                )
            })
    }

    fn gate_and_route(
        &self,
        host: &mut S,
        command_type: &str,
        params: &JsonObject,
    ) -> CommandResponse {
        if let Some(rejection) = self.gate(host, command_type, params) {
            debug!(
                target: DISPATCH_TARGET,
                command = command_type,
                error_code = rejection.error_code(),
                "request rejected by gate"
            );
            return rejection;
        }

        if command_type == BATCH_COMMAND {
            batch::run(params, |sub_type, sub_params| {
                self.resolve(host, sub_type, sub_params)
            })
        } else {
            CommandResponse::from_handler_result(self.resolve(host, command_type, params))
        }
    }

    fn gate(&self, host: &S, command_type: &str, params: &JsonObject) -> Option<CommandResponse> {
        if !host.is_interactive() {
            return Some(CommandResponse::from_error(
                ErrorCode::EditorOnly,
                EDITOR_ONLY_MESSAGE,
                None,
            ));
        }

        let policy = self.security.current();
        let meta = RequestMeta::from_params(params);
        if !policy.accepts_token(meta.token()) {
            return Some(CommandResponse::from_error(
                ErrorCode::Unauthorized,
                UNAUTHORIZED_MESSAGE,
                Some(UNAUTHORIZED_DETAILS),
            ));
        }

        if policy.read_only && is_mutating(command_type) {
            return Some(CommandResponse::from_error(
                ErrorCode::ReadOnly,
                READ_ONLY_MESSAGE,
                Some(READ_ONLY_DETAILS),
            ));
        }

        None
    }

    /// Resolves one command to a handler-shaped result object.
    ///
    /// This is the resolution shared by single commands and batch items; it
    /// performs no gating. `batch` itself is not resolvable here.
    pub fn resolve(&self, host: &mut S, command_type: &str, params: &JsonObject) -> JsonObject {
        if command_type == PING_COMMAND {
            let mut pong = JsonObject::new();
            pong.insert("message".into(), json!("pong"));
            return pong;
        }

        let Some(group) = self.registry.resolve(command_type) else {
            return error_result(
                ErrorCode::UnknownCommand.as_str(),
                &format!("Unknown command: {command_type}"),
                None,
            );
        };

        match panic::catch_unwind(AssertUnwindSafe(|| {
            group.handle_command(host, command_type, params)
        })) {
            Ok(Ok(result)) => result,
            Ok(Err(fault)) => error_result(ErrorCode::Exception.as_str(), fault.message(), None),
            Err(payload) => error_result(
                ErrorCode::Exception.as_str(),
                &panic_message(payload.as_ref()),
                Some(PANIC_DETAILS),
            ),
        }
    }

    /// Registry backing this router.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry<S> {
        &self.registry
    }
}
