//! Synchronous entry point that marshals commands into the host context.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::host::{HostContext, HostHandle, JsonObject};

use super::errors::ErrorCode;
use super::request::RequestMeta;
use super::response::CommandResponse;
use super::router::{CommandRouter, DISPATCH_TARGET};

/// Runs commands on the host's serialized execution context.
///
/// [`Dispatcher::execute`] may be called from any thread. It enqueues one
/// unit of work, blocks until that work has gated, routed and serialized the
/// response, and always returns a well-formed response document.
pub struct Dispatcher<S> {
    router: Arc<CommandRouter<S>>,
    host: HostHandle<S>,
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl<S> Dispatcher<S>
where
    S: HostContext + 'static,
{
    #[must_use]
    pub fn new(router: CommandRouter<S>, host: HostHandle<S>) -> Self {
        Self {
            router: Arc::new(router),
            host,
        }
    }

    /// Executes one command and returns the serialized response.
    pub fn execute(&self, command_type: &str, params: JsonObject) -> String {
        let meta = RequestMeta::from_params(&params);
        let started = Instant::now();
        let router = Arc::clone(&self.router);
        let owned_type = command_type.to_string();

        let outcome = self.host.call(move |host| {
            let response = router.dispatch(host, &owned_type, &params);
            let code = response.error_code().map(str::to_owned);
            (response.to_json(), response.is_success(), code)
        });

        match outcome {
            Ok((body, success, error_code)) => {
                info!(
                    target: DISPATCH_TARGET,
                    request_id = meta.request_id(),
                    trace_id = meta.trace_id(),
                    command = command_type,
                    success,
                    error_code = error_code.as_deref(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "command dispatched"
                );
                body
            }
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    request_id = meta.request_id(),
                    trace_id = meta.trace_id(),
                    command = command_type,
                    %error,
                    "host context unavailable"
                );
                CommandResponse::from_error(ErrorCode::Exception, error.to_string(), None).to_json()
            }
        }
    }
}
