//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use conduit_config::Config;

use crate::health::HealthReporter;
use crate::host::SharedSecurity;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Abstracts configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
}

/// Result of a successful bootstrap.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    config: Config,
    security: SharedSecurity,
    telemetry: TelemetryHandle,
}

impl Bootstrapped {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runtime-adjustable security settings seeded from the configuration.
    #[must_use]
    pub fn security(&self) -> &SharedSecurity {
        &self.security
    }

    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Loads configuration and initialises telemetry, reporting each stage.
///
/// # Errors
///
/// Returns [`BootstrapError`] when either stage fails; the reporter has
/// already been told about the failure.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Bootstrapped, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    let security = SharedSecurity::new(config.security_policy());
    Ok(Bootstrapped {
        config,
        security,
        telemetry,
    })
}
