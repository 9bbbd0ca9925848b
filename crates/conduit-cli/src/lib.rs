//! Controller client for the conduit bridge.
//!
//! [`BridgeClient`] speaks the bridge wire protocol: one JSON envelope per
//! TCP connection, `_mcp` metadata carrying the request identifier and
//! optional token, and a `len32le` framed (or bare JSON) response. The
//! [`run`] entry point wraps it in a small command-line interface used by
//! the `conduit` binary.
//!
//! Exit codes: `0` when the bridge reports `success: true`, `1` for any
//! other response, `2` when no response could be obtained.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::{Map, Value};

mod cli;
mod client;
mod config;
mod errors;

pub use client::{BridgeClient, DEFAULT_TIMEOUT, Framing, MAX_RESPONSE_BYTES};
pub use errors::ClientError;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

const EXIT_FAILURE_RESPONSE: u8 = 1;
const EXIT_TRANSPORT: u8 = 2;

/// Runs the CLI using the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    match execute(args, stdout, loader) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE_RESPONSE),
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(AppError::CliUsage(error)) => {
            let _ = write!(stderr, "{error}");
            ExitCode::from(EXIT_TRANSPORT)
        }
        Err(error) => {
            let _ = writeln!(stderr, "conduit: {error}");
            ExitCode::from(EXIT_TRANSPORT)
        }
    }
}

/// Sends the requested command and prints the response body.
///
/// Returns whether the bridge reported success.
fn execute<I, W, L>(args: I, stdout: &mut W, loader: &L) -> Result<bool, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(&split.command_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    let params = parse_params(cli.params.as_deref())?;

    let address = config.listen_address();
    let token = cli.token.unwrap_or(config.security_token);
    let mut client = BridgeClient::new(address).with_token(token);
    if let Some(millis) = cli.timeout_ms {
        client = client.with_timeout(Duration::from_millis(millis));
    }
    if cli.raw {
        client = client.with_framing(Framing::Raw);
    }

    let body = client.send_raw(&cli.command_type, &params)?;
    let response: Value = serde_json::from_slice(&body).map_err(ClientError::InvalidResponse)?;

    stdout.write_all(&body).map_err(AppError::ForwardResponse)?;
    stdout.write_all(b"\n").map_err(AppError::ForwardResponse)?;
    stdout.flush().map_err(AppError::ForwardResponse)?;

    Ok(response.get("success").and_then(Value::as_bool) == Some(true))
}

fn parse_params(raw: Option<&str>) -> Result<Map<String, Value>, AppError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(other) => Err(AppError::InvalidParams(format!("got {other}"))),
        Err(error) => Err(AppError::InvalidParams(error.to_string())),
    }
}

#[cfg(test)]
mod tests;
