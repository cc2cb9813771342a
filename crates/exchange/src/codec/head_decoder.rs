//! Decoders for inbound message heads.
//!
//! The server role parses request heads, the client role parses response
//! heads. Both run `httparse` over the buffered bytes, enforce the header
//! count and size limits, and on success split the head off the front of the
//! buffer so whatever follows is body.

use bytes::BytesMut;
use http::{Method, StatusCode, Uri, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::config::ExchangeConfig;
use crate::ensure;
use crate::protocol::{Headers, HttpError, ParseError, from_minor};

/// Maximum number of headers allowed in a message head
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// A parsed request head.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
}

/// A parsed response head.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: StatusCode,
    /// Reason phrase as sent by the peer, when it sent one.
    pub reason: Option<String>,
    pub headers: Headers,
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    max_headers: usize,
    max_header_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_headers: MAX_HEADER_NUM, max_header_bytes: MAX_HEADER_BYTES }
    }
}

impl Limits {
    fn from_config(config: &ExchangeConfig) -> Self {
        Self { max_headers: config.max_headers(), max_header_bytes: config.max_header_bytes() }
    }

    fn map_error(&self, e: httparse::Error) -> ParseError {
        match e {
            httparse::Error::TooManyHeaders => ParseError::too_many_headers(self.max_headers),
            httparse::Error::Version => ParseError::invalid_version("unrecognized"),
            httparse::Error::Status => ParseError::invalid_status("unrecognized"),
            e => ParseError::invalid_header(e),
        }
    }

    fn check_partial(&self, buffered: usize) -> Result<(), ParseError> {
        ensure!(buffered <= self.max_header_bytes, ParseError::too_large_header(buffered, self.max_header_bytes));
        Ok(())
    }

    fn check_complete(&self, head_size: usize) -> Result<(), ParseError> {
        trace!(head_size, "parsed head size");
        ensure!(head_size <= self.max_header_bytes, ParseError::too_large_header(head_size, self.max_header_bytes));
        Ok(())
    }
}

fn collect_headers(parsed: &[httparse::Header<'_>]) -> Headers {
    parsed.iter().map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned())).collect()
}

/// Decodes request heads for the server role.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestHeadDecoder {
    limits: Limits,
}

impl RequestHeadDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self { limits: Limits::from_config(config) }
    }
}

impl Decoder for RequestHeadDecoder {
    type Item = RequestHead;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
        let mut req = httparse::Request::new(&mut headers);

        let head_size = match req.parse(src).map_err(|e| self.limits.map_error(e))? {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                self.limits.check_partial(src.len())?;
                return Ok(None);
            }
        };
        self.limits.check_complete(head_size)?;

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;
        let version = from_minor(req.version)?;
        let headers = collect_headers(req.headers);

        let _ = src.split_to(head_size);
        Ok(Some(RequestHead { method, uri, version, headers }))
    }
}

/// Decodes response heads for the client role.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseHeadDecoder {
    limits: Limits,
}

impl ResponseHeadDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self { limits: Limits::from_config(config) }
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = ResponseHead;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
        let mut resp = httparse::Response::new(&mut headers);

        let head_size = match resp.parse(src).map_err(|e| self.limits.map_error(e))? {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                self.limits.check_partial(src.len())?;
                return Ok(None);
            }
        };
        self.limits.check_complete(head_size)?;

        let version = from_minor(resp.version)?;
        let code = resp.code.ok_or_else(|| ParseError::invalid_status(""))?;
        let status = StatusCode::from_u16(code).map_err(|_| ParseError::invalid_status(code))?;
        let reason = resp.reason.filter(|r| !r.is_empty()).map(str::to_string);
        let headers = collect_headers(resp.headers);

        let _ = src.split_to(head_size);
        Ok(Some(ResponseHead { version, status, reason, headers }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use indoc::indoc;

    fn crlf(s: &str) -> BytesMut {
        BytesMut::from(s.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn from_curl() {
        let mut src = crlf(indoc! {r##"
        GET /index.html?a=1 HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##});

        let head = RequestHeadDecoder::new().decode(&mut src).unwrap().unwrap();

        assert_eq!(head.method, Method::GET);
        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.uri.path(), "/index.html");
        assert_eq!(head.uri.query(), Some("a=1"));
        assert_eq!(head.headers.len(), 3);
        assert_eq!(head.headers.find("host"), "127.0.0.1:8080");
        assert_eq!(head.headers.find("accept"), "*/*");
    }

    #[test]
    fn leaves_body_in_buffer() {
        let mut src = crlf("POST /submit HTTP/1.0\nContent-Length: 4\n\n");
        src.extend_from_slice(b"body");

        let head = RequestHeadDecoder::new().decode(&mut src).unwrap().unwrap();
        assert_eq!(head.method, Method::POST);
        assert_eq!(head.version, Version::HTTP_10);
        assert_eq!(&src[..], b"body");
    }

    #[test]
    fn partial_head_needs_more() {
        let mut src = BytesMut::from("GET / HTTP/1.1\r\nHost: a");
        assert!(RequestHeadDecoder::new().decode(&mut src).unwrap().is_none());
        assert_eq!(src.len(), 23);
    }

    #[test]
    fn too_many_headers() {
        let config = ExchangeConfig::default().with_max_headers(2);
        let mut src = crlf("GET / HTTP/1.1\nA: 1\nB: 2\nC: 3\n\n");

        let err = RequestHeadDecoder::from_config(&config).decode(&mut src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(matches!(err, HttpError::Parse { source: ParseError::TooManyHeaders { max_num: 2 } }));
    }

    #[test]
    fn too_large_partial_head() {
        let config = ExchangeConfig::default().with_max_header_bytes(16);
        let mut src = BytesMut::from("GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaa");

        let err = RequestHeadDecoder::from_config(&config).decode(&mut src).unwrap_err();
        assert!(matches!(err, HttpError::Parse { source: ParseError::TooLargeHeader { .. } }));
    }

    #[test]
    fn response_keeps_reason() {
        let mut src = crlf("HTTP/1.1 299 Mostly Fine\nContent-Type: text/plain\n\n");

        let head = ResponseHeadDecoder::new().decode(&mut src).unwrap().unwrap();
        assert_eq!(head.status.as_u16(), 299);
        assert_eq!(head.reason.as_deref(), Some("Mostly Fine"));
        assert_eq!(head.headers.content_type(), "text/plain");
    }

    #[test]
    fn response_with_bad_version() {
        let mut src = crlf("HTTP/x 200 OK\n\n");
        let err = ResponseHeadDecoder::new().decode(&mut src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
