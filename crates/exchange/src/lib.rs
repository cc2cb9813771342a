//! The HTTP/1.x message engine of one request/response exchange
//!
//! This crate models a single exchange: the inbound message a peer sent and
//! the outbound message being composed in answer. It renders wire-correct
//! HTTP/1.x bytes and hands them to an asynchronous connection, without ever
//! touching sockets itself.
//!
//! # Features
//!
//! - Ordered, case-insensitive header table
//! - Header finalization (`Date`, `Content-Length`, `Connection`, `Host`)
//! - Chunked transfer encoding with strict start/end rules
//! - `Accept-Encoding` negotiation with gzip, zlib, bzip2 and lz4 output
//! - JSON bodies streamed as a whole reply or as chunks
//! - Cookies, sessions, query and JSON body arguments
//! - JSON, HTML or plain text error replies
//!
//! # Example
//!
//! ```
//! use http::{Method, StatusCode, Version};
//! use micro_exchange::connection::QueuedConnection;
//! use micro_exchange::Request;
//! use serde_json::json;
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (server, mut client) = tokio::io::duplex(4096);
//!     let connection = QueuedConnection::spawn(server, 1, true, None);
//!
//!     let mut request = Request::incoming(connection, Method::GET, "/hello".parse().unwrap(), Version::HTTP_11);
//!     request.json_writer().serialize(&json!({"hello": "world"})).unwrap();
//!     request.reply(StatusCode::OK).unwrap();
//!     request.flushed().await.unwrap();
//!
//!     let mut wire = vec![0; 4096];
//!     let n = client.read(&mut wire).await.unwrap();
//!     let wire = String::from_utf8_lossy(&wire[..n]);
//!     assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
//!     assert!(wire.ends_with(r#"{"hello":"world"}"#));
//! }
//! ```
//!
//! # Architecture
//!
//! - [`request`]: the [`Request`] exchange, its read accessors and write state machine
//! - [`protocol`]: header table, errors, cookies, sessions and version tokens
//! - [`codec`]: head encoding and decoding, chunk framing
//! - [`compress`]: compression negotiation and the compressing output stream
//! - [`json`]: the streaming JSON bridge
//! - [`connection`]: the connection an exchange writes to
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: Top-level error type, classified by [`protocol::ErrorKind`]
//! - [`protocol::ProtocolError`]: the exchange was driven in an order HTTP does not allow
//! - [`protocol::ParseError`]: bytes from the peer could not be parsed
//! - [`protocol::SendError`]: a write failed or the connection is gone
//!
//! Write failures are reported asynchronously. They are recorded on the
//! request, which refuses further writes and fails [`Request::flushed`].

pub mod codec;
pub mod compress;
pub mod connection;
pub mod date;
pub mod json;
pub mod protocol;
pub mod request;

mod config;
pub use config::ExchangeConfig;
pub use request::{Direction, LogPrefix, Request};

mod utils;
pub(crate) use utils::ensure;
