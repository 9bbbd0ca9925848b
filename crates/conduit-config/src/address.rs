use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const TCP_SCHEME: &str = "tcp://";

/// TCP address the bridge listens on and controllers connect to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListenAddress {
    /// Host name or IP literal. IPv6 literals are stored without brackets.
    pub host: String,
    /// TCP port; `0` asks the operating system for an ephemeral port.
    pub port: u16,
}

impl ListenAddress {
    /// Builds a listen address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "{TCP_SCHEME}[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{TCP_SCHEME}{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenAddress {
    type Err = AddressParseError;

    /// Accepts `tcp://host:port` or a bare `host:port`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let authority = match trimmed.split_once("://") {
            Some(("tcp", rest)) => rest,
            Some((scheme, _)) => {
                return Err(AddressParseError::UnsupportedScheme(scheme.to_string()));
            }
            None => trimmed,
        };
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| AddressParseError::MissingPort(input.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(AddressParseError::MissingHost(input.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressParseError::InvalidPort(port.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// Errors encountered while parsing a [`ListenAddress`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// Scheme other than `tcp` was supplied.
    #[error("unsupported address scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host component was empty.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// Port separator was absent.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Port was not a valid `u16`.
    #[error("invalid TCP port '{0}'")]
    InvalidPort(String),
}
