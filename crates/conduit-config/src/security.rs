use serde::{Deserialize, Serialize};

/// Command-type prefixes that mark a request as state-mutating.
pub const MUTATING_PREFIXES: &[&str] = &[
    "create_", "add_", "set_", "delete_", "spawn_", "import_", "reimport_",
];

/// Command types that are mutating regardless of prefix.
pub const MUTATING_COMMANDS: &[&str] = &["batch"];

/// Security switches consulted before any command reaches a handler.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Shared secret expected in `_mcp.token`. Empty disables the check.
    pub security_token: String,
    /// Rejects mutating command types when set.
    pub read_only: bool,
}

impl SecurityPolicy {
    /// Builds a policy from its parts.
    #[must_use]
    pub fn new(security_token: impl Into<String>, read_only: bool) -> Self {
        Self {
            security_token: security_token.into(),
            read_only,
        }
    }

    /// Returns true when a token must accompany every request.
    #[must_use]
    pub fn requires_token(&self) -> bool {
        !self.security_token.is_empty()
    }

    /// Compares a supplied token against the configured secret.
    ///
    /// Always true when no secret is configured.
    #[must_use]
    pub fn accepts_token(&self, supplied: Option<&str>) -> bool {
        if !self.requires_token() {
            return true;
        }
        supplied == Some(self.security_token.as_str())
    }
}

/// Name-based mutation classification used by the read-only gate.
///
/// The check is purely syntactic; a misnamed command is misclassified.
#[must_use]
pub fn is_mutating(command_type: &str) -> bool {
    MUTATING_COMMANDS.contains(&command_type)
        || MUTATING_PREFIXES
            .iter()
            .any(|prefix| command_type.starts_with(prefix))
}
