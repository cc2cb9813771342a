//! Response body compression.
//!
//! - [`Compression`]: the schemes an exchange can produce
//! - [`requested_compression`]: picks a scheme from an `Accept-Encoding` value
//! - [`OutputStream`]: a compressor stage in front of a byte buffer, flushed
//!   when finished or dropped

mod encoder;
mod negotiate;

pub use encoder::OutputStream;
pub use negotiate::requested_compression;

use std::fmt;

/// A body compression scheme.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Zlib,
    Gzip,
    Bzip2,
    Lz4,
    /// Resolve from the request's `Accept-Encoding` when the body is
    /// produced. Never returned by negotiation.
    Auto,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Lz4 => "lz4",
            Compression::Auto => "auto",
        }
    }

    /// Value for the `Content-Encoding` header, `None` when the body is not
    /// encoded or the scheme is not concrete.
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self {
            Compression::Zlib | Compression::Gzip | Compression::Bzip2 | Compression::Lz4 => Some(self.name()),
            Compression::None | Compression::Auto => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
