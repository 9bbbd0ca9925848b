//! Shared configuration for the conduit command bridge and its client.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an optional
//! configuration file, then `CONDUIT_*` environment variables, then
//! command-line flags. Both `conduitd` and `conduit` load the same [`Config`]
//! so the client always dials the address the bridge binds.

mod address;
mod defaults;
mod logging;
mod security;

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use address::{AddressParseError, ListenAddress};
pub use defaults::{
    DEFAULT_HOST, DEFAULT_PORT, default_host, default_listen_address, default_port,
};
pub use logging::{
    DEFAULT_LOG_FILTER, LogFormat, LogFormatParseError, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use security::{MUTATING_COMMANDS, MUTATING_PREFIXES, SecurityPolicy, is_mutating};

/// Resolved bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CONDUIT")]
pub struct Config {
    /// Interface the bridge binds to.
    #[serde(default = "default_host")]
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port the bridge binds to.
    #[serde(default = "default_port")]
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Shared secret required in `_mcp.token`; empty disables enforcement.
    #[serde(default)]
    #[ortho_config(default = String::new())]
    pub security_token: String,
    /// Rejects mutating command types when enabled.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub read_only: bool,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            security_token: String::new(),
            read_only: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and files.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when any source is malformed.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration using `args` in place of the process arguments.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when any source is malformed.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Address the bridge listens on.
    #[must_use]
    pub fn listen_address(&self) -> ListenAddress {
        ListenAddress::new(self.host.clone(), self.port)
    }

    /// Security switches seeded from configuration.
    #[must_use]
    pub fn security_policy(&self) -> SecurityPolicy {
        SecurityPolicy::new(self.security_token.clone(), self.read_only)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
