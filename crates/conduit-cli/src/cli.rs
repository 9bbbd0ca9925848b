//! CLI argument definitions for the conduit controller.

use clap::Parser;

/// Sends one command to a running conduit bridge and prints the response.
#[derive(Parser, Debug)]
#[command(name = "conduit", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Shared secret sent as `_mcp.token`; overrides the configured token.
    #[arg(long)]
    pub(crate) token: Option<String>,
    /// Asks the bridge for an unframed response instead of `len32le`.
    #[arg(long)]
    pub(crate) raw: bool,
    /// Connect, write and read timeout in milliseconds.
    #[arg(long, value_name = "MILLIS")]
    pub(crate) timeout_ms: Option<u64>,
    /// Command type, for example `ping` or `spawn_actor`.
    #[arg(value_name = "TYPE")]
    pub(crate) command_type: String,
    /// Command parameters as a JSON object.
    #[arg(value_name = "PARAMS_JSON")]
    pub(crate) params: Option<String>,
}
