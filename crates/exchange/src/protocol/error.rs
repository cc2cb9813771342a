use std::io;

use http::StatusCode;
use thiserror::Error;

/// Coarse classification of an [`HttpError`].
///
/// Callers branch on this instead of matching every variant: protocol
/// violations and malformed input are local, synchronous failures, transport
/// failures mean the exchange can not be written to anymore.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller drove the exchange in an order HTTP does not allow.
    ProtocolViolation,
    /// A required header or cookie is absent.
    NotFound,
    /// A write did not complete, or the connection is gone.
    TransportFailure,
    /// Bytes received from the peer could not be parsed.
    MalformedInput,
    /// An application error that carries its own status code.
    Application,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("protocol violation: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{message}")]
    Status { status: StatusCode, message: String },
}

impl HttpError {
    pub fn not_found<S: ToString>(what: S) -> Self {
        Self::NotFound { what: what.to_string() }
    }

    /// An application error answered with `status`.
    pub fn status<S: ToString>(status: StatusCode, message: S) -> Self {
        Self::Status { status, message: message.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::Protocol { .. } => ErrorKind::ProtocolViolation,
            HttpError::Parse { .. } => ErrorKind::MalformedInput,
            HttpError::Send { .. } => ErrorKind::TransportFailure,
            HttpError::NotFound { .. } => ErrorKind::NotFound,
            HttpError::Status { .. } => ErrorKind::Application,
        }
    }

    /// The status this error asks to be answered with, if it carries one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        SendError::io(e).into()
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("request already replying")]
    AlreadyReplying,

    #[error("not chunked")]
    NotChunked,

    #[error("cannot start chunked with content-length set")]
    ChunkedWithContentLength,

    #[error("cannot start chunked with http version {version:?}")]
    ChunkedVersion { version: http::Version },

    #[error("cannot start chunked with {method} {status:?}, no body allowed")]
    ChunkedWithoutBody { method: http::Method, status: Option<StatusCode> },

    #[error("cannot start chunked, {pending} bytes already in output buffer")]
    ChunkedPendingOutput { pending: usize },

    #[error("unexpected compression method: {compression}")]
    UnsupportedCompression { compression: &'static str },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {token:?}")]
    InvalidVersion { token: String },

    #[error("invalid http response line: {line:?}")]
    InvalidResponseLine { line: String },

    #[error("bad response code {code:?}")]
    InvalidStatus { code: String },

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid json body: {source}")]
    InvalidJson {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid query string: {source}")]
    InvalidQuery {
        #[from]
        source: serde_urlencoded::de::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_version<S: ToString>(token: S) -> Self {
        Self::InvalidVersion { token: token.to_string() }
    }

    pub fn invalid_response_line<S: ToString>(line: S) -> Self {
        Self::InvalidResponseLine { line: line.to_string() }
    }

    pub fn invalid_status<S: ToString>(code: S) -> Self {
        Self::InvalidStatus { code: code.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("connection is closed")]
    ConnectionClosed,

    #[error("exchange has a recorded connection error")]
    ConnectionError,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(HttpError::from(ProtocolError::NotChunked).kind(), ErrorKind::ProtocolViolation);
        assert_eq!(HttpError::from(ParseError::InvalidMethod).kind(), ErrorKind::MalformedInput);
        assert_eq!(HttpError::from(SendError::ConnectionClosed).kind(), ErrorKind::TransportFailure);
        assert_eq!(HttpError::not_found("cookie 'sid'").kind(), ErrorKind::NotFound);
        assert_eq!(HttpError::from(io::Error::other("reset")).kind(), ErrorKind::TransportFailure);
    }

    #[test]
    fn only_status_errors_carry_a_code() {
        let e = HttpError::status(StatusCode::FORBIDDEN, "no access");
        assert_eq!(e.status_code(), Some(StatusCode::FORBIDDEN));
        assert_eq!(e.to_string(), "no access");

        assert_eq!(HttpError::not_found("x").status_code(), None);
    }
}
