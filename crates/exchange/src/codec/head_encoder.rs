//! Serializes the head of an HTTP/1.x message: the start line, every
//! non-empty header and the blank line that ends the head.
//!
//! Header finalization (`Date`, `Content-Length`, `Connection`, ...) is the
//! job of the [`Request`](crate::request::Request); this encoder writes
//! exactly the table it is given.

use std::fmt;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{Method, StatusCode, Uri, Version};
use tokio_util::codec::Encoder;

use crate::codec::FastWrite;
use crate::protocol::{Headers, SendError, version_number};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// First line of a message.
#[derive(Debug, Clone, Copy)]
pub enum StartLine<'a> {
    /// `HTTP/<v> <code> <reason>`. An explicit reason keeps the text a peer
    /// sent, otherwise the canonical reason phrase is used.
    Status { version: Version, status: StatusCode, reason: Option<&'a str> },
    /// `<METHOD> <target> HTTP/<v>`
    Request { method: &'a Method, uri: &'a Uri, version: Version },
}

impl fmt::Display for StartLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartLine::Status { version, status, reason } => {
                let reason = reason.or_else(|| status.canonical_reason()).unwrap_or("");
                write!(f, "HTTP/{} {} {}", version_number(*version), status.as_str(), reason)
            }
            StartLine::Request { method, uri, version } => {
                let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
                write!(f, "{} {} HTTP/{}", method, target, version_number(*version))
            }
        }
    }
}

/// A start line together with the headers that follow it.
#[derive(Debug, Clone, Copy)]
pub struct MessageHead<'a> {
    pub start_line: StartLine<'a>,
    pub headers: &'a Headers,
}

/// Encoder for message heads implementing the [`Encoder`] trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadEncoder;

impl<'a> Encoder<MessageHead<'a>> for HeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: MessageHead<'a>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{}\r\n", item.start_line)?;
        item.headers.encode(dst);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_uses_canonical_reason() {
        let line = StartLine::Status { version: Version::HTTP_11, status: StatusCode::NOT_FOUND, reason: None };
        assert_eq!(line.to_string(), "HTTP/1.1 404 Not Found");
    }

    #[test]
    fn status_line_keeps_peer_reason() {
        let line = StartLine::Status { version: Version::HTTP_10, status: StatusCode::OK, reason: Some("Fine") };
        assert_eq!(line.to_string(), "HTTP/1.0 200 Fine");
    }

    #[test]
    fn request_line_uses_origin_form() {
        let uri: Uri = "http://example.com/api/items?limit=5".parse().unwrap();
        let line = StartLine::Request { method: &Method::POST, uri: &uri, version: Version::HTTP_11 };
        assert_eq!(line.to_string(), "POST /api/items?limit=5 HTTP/1.1");
    }

    #[test]
    fn encode_head() {
        let headers: Headers = [("Content-Length", "2"), ("X-Skipped", "")].into_iter().collect();
        let head = MessageHead {
            start_line: StartLine::Status { version: Version::HTTP_11, status: StatusCode::OK, reason: None },
            headers: &headers,
        };

        let mut dst = BytesMut::new();
        HeadEncoder.encode(head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n");
    }
}
