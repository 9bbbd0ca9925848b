//! Response framing.
//!
//! Each request picks its own framing through `_mcp.response_framing`.
//! `"len32le"` prefixes the body with its byte length as a little-endian
//! `u32`; anything else, including absence, writes the body raw.

use std::io::{self, Write};

use super::errors::FramingError;
use super::request::RequestMeta;

/// Wire value selecting the length-prefixed mode.
pub const LEN32LE: &str = "len32le";

/// Framing mode for one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFraming {
    /// Body bytes only.
    #[default]
    Raw,
    /// Four-byte little-endian length, then the body.
    Len32Le,
}

impl ResponseFraming {
    /// Reads the framing mode from request metadata.
    #[must_use]
    pub fn from_meta(meta: &RequestMeta) -> Self {
        match meta.response_framing() {
            Some(LEN32LE) => Self::Len32Le,
            _ => Self::Raw,
        }
    }

    /// Produces the exact bytes to put on the wire for `body`.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::BodyTooLarge`] when a length-prefixed body
    /// exceeds `u32::MAX` bytes.
    pub fn encode(self, body: &[u8]) -> Result<Vec<u8>, FramingError> {
        match self {
            Self::Raw => Ok(body.to_vec()),
            Self::Len32Le => {
                let len = u32::try_from(body.len())
                    .map_err(|_| FramingError::BodyTooLarge { size: body.len() })?;
                let mut framed = Vec::with_capacity(body.len() + 4);
                framed.extend_from_slice(&len.to_le_bytes());
                framed.extend_from_slice(body);
                Ok(framed)
            }
        }
    }
}

/// Writes framed responses to a connection.
pub struct ResponseFramer<W> {
    writer: W,
}

impl<W: Write> ResponseFramer<W> {
    /// Wraps an output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Frames `body` and writes it in full.
    ///
    /// The whole frame is built before the first byte is written. Short
    /// writes are resumed; a write that accepts zero bytes aborts.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError`] when encoding or writing fails.
    pub fn write_response(
        &mut self,
        framing: ResponseFraming,
        body: &str,
    ) -> Result<(), FramingError> {
        let frame = framing.encode(body.as_bytes())?;
        let mut remaining = frame.as_slice();
        while !remaining.is_empty() {
            match self.writer.write(remaining) {
                Ok(0) => return Err(FramingError::WriteZero),
                Ok(sent) => remaining = &remaining[sent..],
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(FramingError::Io(error)),
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn meta(framing: Option<&str>) -> RequestMeta {
        let object = match framing {
            Some(value) => json!({ "response_framing": value }),
            None => json!({}),
        };
        RequestMeta::from_object(object.as_object().expect("object"))
    }

    #[rstest]
    #[case(Some("len32le"), ResponseFraming::Len32Le)]
    #[case(Some("raw"), ResponseFraming::Raw)]
    #[case(Some("LEN32LE"), ResponseFraming::Raw)]
    #[case(Some("chunked"), ResponseFraming::Raw)]
    #[case(None, ResponseFraming::Raw)]
    fn framing_is_selected_from_metadata(
        #[case] requested: Option<&str>,
        #[case] expected: ResponseFraming,
    ) {
        assert_eq!(ResponseFraming::from_meta(&meta(requested)), expected);
    }

    #[rstest]
    #[case("")]
    #[case("{}")]
    #[case(r#"{"success":true,"status":"success","result":{}}"#)]
    fn length_prefix_matches_body_length(#[case] body: &str) {
        let frame = ResponseFraming::Len32Le
            .encode(body.as_bytes())
            .expect("encode");
        let (prefix, payload) = frame.split_at(4);
        let declared = u32::from_le_bytes(prefix.try_into().expect("four bytes"));
        assert_eq!(declared as usize, payload.len());
        assert_eq!(payload, body.as_bytes());
    }

    #[rstest]
    fn raw_framing_writes_body_verbatim() {
        let mut sink = Vec::new();
        ResponseFramer::new(&mut sink)
            .write_response(ResponseFraming::Raw, "{\"ok\":1}")
            .expect("write");
        assert_eq!(sink, b"{\"ok\":1}");
    }

    struct Trickle {
        written: Vec<u8>,
        stalled: bool,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.stalled {
                return Ok(0);
            }
            self.written.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    fn short_writes_are_resumed() {
        let mut sink = Trickle {
            written: Vec::new(),
            stalled: false,
        };
        ResponseFramer::new(&mut sink)
            .write_response(ResponseFraming::Len32Le, "abc")
            .expect("write");
        assert_eq!(sink.written, [3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[rstest]
    fn zero_byte_write_aborts() {
        let mut sink = Trickle {
            written: Vec::new(),
            stalled: true,
        };
        let error = ResponseFramer::new(&mut sink)
            .write_response(ResponseFraming::Raw, "abc")
            .expect_err("stalled writer");
        assert!(matches!(error, FramingError::WriteZero));
    }
}
