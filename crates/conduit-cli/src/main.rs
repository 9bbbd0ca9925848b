//! CLI entrypoint for the conduit controller.
//!
//! The binary delegates to [`conduit_cli::run`], which loads configuration,
//! parses the command and exchanges one request with the bridge.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    conduit_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
