//! Capability registry mapping command types to handler groups.
//!
//! The registry is assembled once at startup and frozen; the router only
//! ever reads from it. Handler groups receive the host state mutably because
//! they always run inside the serialized host context.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

/// JSON object used for command parameters and results.
pub type JsonObject = Map<String, Value>;

/// Command types answered by the router itself.
pub const RESERVED_COMMANDS: &[&str] = &["ping", "batch"];

/// Fault raised by a handler group that could not complete a command.
///
/// Faults are reported to the client as `EXCEPTION` errors. Expected domain
/// failures should instead be returned as `{"success": false, ...}` result
/// objects so their error codes pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandFault {
    message: String,
}

impl CommandFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for CommandFault {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Handler group serving a cluster of related command types.
pub trait CommandGroup<S>: Send + Sync {
    /// Executes `command_type` against the host state.
    ///
    /// The returned object becomes the `result` payload. A `success` field
    /// set to `false` marks the command as failed.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandFault`] when the handler cannot produce a result.
    fn handle_command(
        &self,
        host: &mut S,
        command_type: &str,
        params: &JsonObject,
    ) -> Result<JsonObject, CommandFault>;
}

/// Errors raised while assembling the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two groups claimed the same command type.
    #[error("command type '{command_type}' is registered more than once")]
    DuplicateCommand { command_type: String },
    /// A group tried to claim a command answered by the router.
    #[error("command type '{command_type}' is reserved by the bridge")]
    ReservedCommand { command_type: String },
}

/// Frozen routing table from command type to handler group.
pub struct CapabilityRegistry<S> {
    routes: HashMap<String, Arc<dyn CommandGroup<S>>>,
}

impl<S> CapabilityRegistry<S> {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder<S> {
        RegistryBuilder {
            routes: HashMap::new(),
            error: None,
        }
    }

    /// Creates a registry with no handler groups.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Looks up the handler group serving `command_type`.
    #[must_use]
    pub fn resolve(&self, command_type: &str) -> Option<&dyn CommandGroup<S>> {
        self.routes.get(command_type).map(|group| &**group)
    }

    /// Returns `true` when a group serves `command_type`.
    #[must_use]
    pub fn contains(&self, command_type: &str) -> bool {
        self.routes.contains_key(command_type)
    }

    /// Lists registered command types in lexical order.
    #[must_use]
    pub fn command_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl<S> fmt::Debug for CapabilityRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("commands", &self.command_types())
            .finish()
    }
}

/// Builder collecting handler groups before the registry is frozen.
pub struct RegistryBuilder<S> {
    routes: HashMap<String, Arc<dyn CommandGroup<S>>>,
    error: Option<RegistryError>,
}

impl<S> RegistryBuilder<S> {
    /// Registers `group` for each of `command_types`.
    #[must_use]
    pub fn group<G>(self, command_types: &[&str], group: G) -> Self
    where
        G: CommandGroup<S> + 'static,
    {
        self.shared_group(command_types, Arc::new(group))
    }

    /// Registers an already shared group for each of `command_types`.
    #[must_use]
    pub fn shared_group(
        mut self,
        command_types: &[&str],
        group: Arc<dyn CommandGroup<S>>,
    ) -> Self {
        for command_type in command_types {
            if self.error.is_some() {
                break;
            }
            if RESERVED_COMMANDS.contains(command_type) {
                self.error = Some(RegistryError::ReservedCommand {
                    command_type: (*command_type).to_string(),
                });
                break;
            }
            match self.routes.entry((*command_type).to_string()) {
                Entry::Occupied(entry) => {
                    self.error = Some(RegistryError::DuplicateCommand {
                        command_type: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::clone(&group));
                }
            }
        }
        self
    }

    /// Freezes the routing table.
    ///
    /// # Errors
    ///
    /// Returns the first registration conflict encountered.
    pub fn build(self) -> Result<CapabilityRegistry<S>, RegistryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(CapabilityRegistry {
                routes: self.routes,
            }),
        }
    }
}
