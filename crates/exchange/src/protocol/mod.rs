//! Protocol data model of one HTTP exchange.
//!
//! - [`Headers`]: ordered, case-insensitive header table used for both
//!   inbound and outbound headers
//! - [`HttpError`] and its sources: the error taxonomy of the crate
//! - [`Cookie`] / [`cookie::lookup`]: cookie parsing and `Set-Cookie` values
//! - [`Session`]: login sessions shared across exchanges
//! - version helpers for the `HTTP/<major>.<minor>` token

mod error;
pub use error::ErrorKind;
pub use error::HttpError;
pub use error::ParseError;
pub use error::ProtocolError;
pub use error::SendError;

mod headers;
pub use headers::Headers;

pub mod cookie;
pub use cookie::Cookie;

mod session;
pub use session::Session;

mod version;
pub(crate) use version::from_minor;
pub use version::parse_http_version;
pub use version::version_number;
