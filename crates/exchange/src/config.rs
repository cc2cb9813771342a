//! Settings shared by every exchange of a server or client.
//!
//! [`ExchangeConfig`] is cheap to share behind an `Arc` and can be built in
//! code with the `with_*` methods or deserialized from any serde format.
//!
//! ```
//! use micro_exchange::ExchangeConfig;
//!
//! let config: ExchangeConfig = serde_json::from_str(r#"{"session_cookie": "auth"}"#).unwrap();
//! assert_eq!(config.session_cookie(), "auth");
//! assert_eq!(config.max_headers(), 64);
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    session_cookie: String,
    session_header: String,
    pretty_json_param: String,
    max_header_bytes: usize,
    max_headers: usize,
    compression_level: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            session_cookie: "sid".to_string(),
            session_header: "X-Session-ID".to_string(),
            pretty_json_param: "pretty".to_string(),
            max_header_bytes: 8 * 1024,
            max_headers: 64,
            compression_level: 6,
        }
    }
}

impl ExchangeConfig {
    /// Cookie carrying the session id.
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// Header carrying the session id, preferred over the cookie.
    pub fn session_header(&self) -> &str {
        &self.session_header
    }

    /// Query parameter that turns on pretty-printed JSON replies.
    pub fn pretty_json_param(&self) -> &str {
        &self.pretty_json_param
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    /// Level used by the gzip, zlib and bzip2 compressors, clamped to `1..=9`.
    pub fn compression_level(&self) -> u32 {
        self.compression_level.clamp(1, 9)
    }

    pub fn with_session_cookie<S: Into<String>>(mut self, name: S) -> Self {
        self.session_cookie = name.into();
        self
    }

    pub fn with_session_header<S: Into<String>>(mut self, name: S) -> Self {
        self.session_header = name.into();
        self
    }

    pub fn with_pretty_json_param<S: Into<String>>(mut self, name: S) -> Self {
        self.pretty_json_param = name.into();
        self
    }

    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    pub fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }
}
