//! HTTP version tokens.
//!
//! `http::Version` orders versions correctly but only prints them through
//! `Debug`; these helpers produce and parse the `HTTP/<major>.<minor>` token
//! used on the start line.

use http::Version;

use crate::protocol::ParseError;

/// The `<major>.<minor>` part of a version token.
pub fn version_number(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

/// Parses a token such as `HTTP/1.1`.
pub fn parse_http_version(token: &str) -> Result<Version, ParseError> {
    let number = token.strip_prefix("HTTP/").ok_or_else(|| ParseError::invalid_version(token))?;

    match number {
        "0.9" => Ok(Version::HTTP_09),
        "1.0" => Ok(Version::HTTP_10),
        "1.1" => Ok(Version::HTTP_11),
        "2" | "2.0" => Ok(Version::HTTP_2),
        "3" | "3.0" => Ok(Version::HTTP_3),
        _ => Err(ParseError::invalid_version(token)),
    }
}

/// Maps the minor version reported by `httparse` (always HTTP/1.x).
pub(crate) fn from_minor(minor: Option<u8>) -> Result<Version, ParseError> {
    match minor {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        other => Err(ParseError::invalid_version(format!("HTTP/1.{}", other.map_or("?".to_string(), |m| m.to_string())))),
    }
}
