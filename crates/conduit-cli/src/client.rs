//! Blocking client for the bridge wire protocol.
//!
//! The bridge serves exactly one request per connection, so every call opens
//! a fresh TCP stream, writes one envelope and reads one response.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use conduit_config::ListenAddress;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ClientError;

/// Default connect, write and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Largest response body the client accepts.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

const LEN32LE: &str = "len32le";
const READ_CHUNK_BYTES: usize = 8 * 1024;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Response framing requested from the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Four-byte little-endian length prefix before the body.
    #[default]
    Len32Le,
    /// Bare JSON body.
    Raw,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    command_type: &'a str,
    params: &'a Map<String, Value>,
    #[serde(rename = "_mcp")]
    meta: Meta<'a>,
}

#[derive(Debug, Serialize)]
struct Meta<'a> {
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_framing: Option<&'static str>,
}

/// One-shot request client for a conduit bridge.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    address: ListenAddress,
    timeout: Duration,
    token: Option<String>,
    framing: Framing,
}

impl BridgeClient {
    #[must_use]
    pub fn new(address: ListenAddress) -> Self {
        Self {
            address,
            timeout: DEFAULT_TIMEOUT,
            token: None,
            framing: Framing::default(),
        }
    }

    /// Overrides the connect, write and read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `token` as `_mcp.token` on every request. Empty disables it.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Selects the response framing requested from the bridge.
    #[must_use]
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    #[must_use]
    pub fn address(&self) -> &ListenAddress {
        &self.address
    }

    /// Sends one command and returns the parsed response document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the exchange fails or the body is not
    /// JSON.
    pub fn send(&self, command_type: &str, params: &Map<String, Value>) -> Result<Value, ClientError> {
        let body = self.send_raw(command_type, params)?;
        serde_json::from_slice(&body).map_err(ClientError::InvalidResponse)
    }

    /// Sends one command and returns the unframed response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the connection, write or read fails.
    pub fn send_raw(
        &self,
        command_type: &str,
        params: &Map<String, Value>,
    ) -> Result<Vec<u8>, ClientError> {
        let envelope = Envelope {
            command_type,
            params,
            meta: Meta {
                request_id: next_request_id(),
                token: self.token.as_deref(),
                response_framing: match self.framing {
                    Framing::Len32Le => Some(LEN32LE),
                    Framing::Raw => None,
                },
            },
        };
        let request = serde_json::to_vec(&envelope).map_err(ClientError::Serialise)?;

        let mut stream = self.connect()?;
        stream.write_all(&request).map_err(ClientError::Send)?;
        stream.flush().map_err(ClientError::Send)?;
        read_response(&mut stream, self.framing)
    }

    /// Sends `ping` and reports whether the bridge answered successfully.
    ///
    /// A connect-only probe would hold the bridge's single accept slot until
    /// its request timeout, so this performs a real round trip.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the bridge cannot be reached.
    pub fn check_connection(&self) -> Result<bool, ClientError> {
        let response = self.send("ping", &Map::new())?;
        Ok(response.get("success").and_then(Value::as_bool) == Some(true))
    }

    fn connect(&self) -> Result<TcpStream, ClientError> {
        let address = self.resolve()?;
        let stream = TcpStream::connect_timeout(&address, self.timeout).map_err(|source| {
            ClientError::Connect {
                address: self.address.to_string(),
                source,
            }
        })?;
        let configure = |stream: &TcpStream| -> io::Result<()> {
            stream.set_nodelay(true)?;
            stream.set_read_timeout(Some(self.timeout))?;
            stream.set_write_timeout(Some(self.timeout))
        };
        configure(&stream).map_err(|source| ClientError::Connect {
            address: self.address.to_string(),
            source,
        })?;
        Ok(stream)
    }

    fn resolve(&self) -> Result<SocketAddr, ClientError> {
        let resolve_error = |source| ClientError::Resolve {
            address: self.address.to_string(),
            source,
        };
        (self.address.host.as_str(), self.address.port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .next()
            .ok_or_else(|| {
                resolve_error(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no resolved addresses",
                ))
            })
    }
}

fn next_request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let sequence = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("conduit-{}-{nanos:x}-{sequence}", std::process::id())
}

/// Reads one response in the framing the client asked for.
///
/// For `len32le` the four-byte header is read first. A header that is not a
/// usable length but starts with `{` or `[` comes from a bridge that ignored
/// the framing request; those bytes open an unframed body instead.
pub(crate) fn read_response<R: Read>(
    reader: &mut R,
    framing: Framing,
) -> Result<Vec<u8>, ClientError> {
    match framing {
        Framing::Len32Le => read_framed(reader),
        Framing::Raw => read_unframed(reader, Vec::new()),
    }
}

fn opens_json(bytes: &[u8]) -> bool {
    matches!(bytes.first(), Some(b'{' | b'['))
}

fn read_framed<R: Read>(reader: &mut R) -> Result<Vec<u8>, ClientError> {
    let mut header = [0_u8; 4];
    let received = read_fully(reader, &mut header)?;
    if received < header.len() {
        let partial = header.get(..received).unwrap_or_default();
        return if opens_json(partial) {
            read_unframed(reader, partial.to_vec())
        } else {
            Err(ClientError::NoResponse)
        };
    }

    let size = usize::try_from(u32::from_le_bytes(header)).unwrap_or(usize::MAX);
    let usable = size > 0 && size <= MAX_RESPONSE_BYTES;
    if !usable && opens_json(&header) {
        return read_unframed(reader, header.to_vec());
    }
    if size > MAX_RESPONSE_BYTES {
        return Err(ClientError::ResponseTooLarge {
            size,
            max_size: MAX_RESPONSE_BYTES,
        });
    }

    let mut body = vec![0_u8; size];
    let received = read_fully(reader, &mut body)?;
    if received != size {
        return Err(ClientError::Receive(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("response truncated after {received} of {size} bytes"),
        )));
    }
    Ok(body)
}

fn read_unframed<R: Read>(reader: &mut R, mut body: Vec<u8>) -> Result<Vec<u8>, ClientError> {
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
    loop {
        if serde_json::from_slice::<Value>(&body).is_ok() {
            return Ok(body);
        }
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(ClientError::Receive(error)),
        };
        body.extend(chunk.iter().take(read));
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(ClientError::ResponseTooLarge {
                size: body.len(),
                max_size: MAX_RESPONSE_BYTES,
            });
        }
    }
    if body.is_empty() {
        return Err(ClientError::NoResponse);
    }
    serde_json::from_slice::<Value>(&body).map_err(ClientError::InvalidResponse)?;
    Ok(body)
}

/// Fills `buffer` unless the peer closes first; returns the bytes read.
fn read_fully<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize, ClientError> {
    let mut filled = 0;
    while filled < buffer.len() {
        let Some(remaining) = buffer.get_mut(filled..) else {
            break;
        };
        match reader.read(remaining) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(ClientError::Receive(error)),
        }
    }
    Ok(filled)
}
