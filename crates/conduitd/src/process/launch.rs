//! Launch sequencing for the standalone bridge daemon.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::bridge::Bridge;
use crate::dispatch::CommandRouter;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::host::work_queue;
use crate::scene::{self, SceneHost};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to run the daemon.
pub struct LaunchPlan<L, S> {
    pub loader: L,
    pub reporter: Arc<dyn HealthReporter>,
    pub shutdown: S,
}

/// Runs the daemon with production collaborators until a termination signal
/// arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when any launch or shutdown stage fails.
pub fn run_bridge() -> Result<(), LaunchError> {
    run_bridge_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
    })
}

/// Runs the daemon with injected collaborators.
///
/// The scene host lives on a dedicated worker thread that serves as the
/// serialized execution context. Shutdown stops the bridge first, which
/// drops its host handle and lets the worker drain and exit.
///
/// # Errors
///
/// Returns [`LaunchError`] when any launch or shutdown stage fails.
pub fn run_bridge_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
    } = plan;

    let runtime = bootstrap_with(&loader, reporter.as_ref())?;
    let registry = scene::registry()?;
    let security = Arc::new(runtime.security().clone());
    let router = CommandRouter::new(registry, security);

    let (host, queue) = work_queue::<SceneHost>();
    let worker = queue.spawn(SceneHost::new())?;
    let bridge = Bridge::serve(&runtime.config().listen_address(), router, host)?;
    reporter.bridge_listening(bridge.local_addr());

    shutdown.wait()?;
    reporter.bridge_stopping();
    bridge.stop()?;
    let scene = worker.join()?;
    reporter.bridge_stopped();
    info!(
        target: PROCESS_TARGET,
        actors = scene.len(),
        "shutdown sequence completed"
    );
    Ok(())
}
