//! Configuration loading helpers for the conduit CLI.
//!
//! Leading configuration flags are routed to `ortho-config` so the bridge
//! address resolves the same way the daemon resolves it. Everything from the
//! first unrecognised token onwards belongs to the command parser.

use std::ffi::{OsStr, OsString};

use conduit_config::Config;

use crate::errors::AppError;

/// Flags consumed by the configuration loader rather than the command parser.
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--host", "--port"];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    ///
    /// Configuration flags must appear before any command tokens.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let argument_text = argument.to_string_lossy();
    if !argument_text.starts_with("--") {
        return FlagAction::Skip;
    }

    let (flag, has_inline_value) = match argument_text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (argument_text.as_ref(), false),
    };

    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

/// Splits `args` (program name first) into configuration and command parts.
///
/// Both halves keep the program name so each parser sees a conventional
/// argument vector.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter().peekable();
    while let Some(argument) = remaining.peek() {
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push((*argument).clone());
                remaining.next();
                if needs_value {
                    config_arguments.extend(remaining.next().cloned());
                }
            }
            FlagAction::Skip => break,
        }
    }

    let mut command_arguments = vec![program.clone()];
    command_arguments.extend(remaining.cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}
