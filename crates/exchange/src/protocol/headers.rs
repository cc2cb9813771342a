//! Ordered, case-insensitive header table.
//!
//! `http::HeaderMap` lowercases names and groups duplicates, which loses the
//! shape a peer sent and the order handlers added headers in. [`Headers`]
//! keeps `(name, value)` pairs exactly as inserted and only folds case when
//! looking names up, so the same table serves both inbound and outbound
//! headers.

use std::fmt;

use bytes::{BufMut, BytesMut};
use http::header::{self, HeaderName, HeaderValue};
use mime::Mime;
use tracing::warn;

use crate::protocol::HttpError;

/// An ordered multimap of HTTP header names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns the first value for `name`, or an empty string when absent.
    pub fn find(&self, name: &str) -> &str {
        self.position(name).map_or("", |i| self.entries[i].1.as_str())
    }

    /// Returns the first value for `name`, failing with `NotFound` when absent.
    pub fn get(&self, name: &str) -> Result<&str, HttpError> {
        self.position(name)
            .map(|i| self.entries[i].1.as_str())
            .ok_or_else(|| HttpError::not_found(format!("header '{name}'")))
    }

    /// Iterates every value stored under `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Appends a header, keeping any earlier value with the same name.
    pub fn insert<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces the value of `name`.
    ///
    /// The first occurrence keeps its position, later duplicates are dropped.
    /// When the name is absent the header is appended.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => {
                self.entries[i].1 = value.into();
                let mut seen = 0;
                self.entries.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.entries.push((name, value.into())),
        }
    }

    /// Removes every value stored under `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn has_content_type(&self) -> bool {
        self.has(header::CONTENT_TYPE.as_str())
    }

    pub fn content_type(&self) -> &str {
        self.find(header::CONTENT_TYPE.as_str())
    }

    pub fn set_content_type<V: Into<String>>(&mut self, content_type: V) {
        self.set("Content-Type", content_type);
    }

    /// Sets `Content-Type` from a file extension, `application/octet-stream`
    /// when the extension is unknown.
    pub fn guess_content_type(&mut self, extension: &str) {
        let mime = content_type_for(extension);
        self.set_content_type(mime.as_ref());
    }

    /// True when the `Connection` header asks for keep-alive.
    pub fn connection_keep_alive(&self) -> bool {
        self.find(header::CONNECTION.as_str()).trim().eq_ignore_ascii_case("keep-alive")
    }

    /// True when the `Connection` header asks to close.
    pub fn needs_close(&self) -> bool {
        self.find(header::CONNECTION.as_str()).trim().eq_ignore_ascii_case("close")
    }

    /// Writes every non-empty header as `Name: value\r\n`.
    ///
    /// Names and values that are not valid on the wire, such as values
    /// carrying CR or LF, are dropped. The blank line ending the head is
    /// left to the caller.
    pub fn encode(&self, dst: &mut BytesMut) {
        for (name, value) in self.iter() {
            if value.is_empty() {
                continue;
            }
            if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
                warn!("dropping invalid header {:?}: {:?}", name, value);
                continue;
            }
            dst.reserve(name.len() + value.len() + 4);
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let entries = iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect();
        Self { entries }
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for Headers {
    fn extend<T: IntoIterator<Item = (N, V)>>(&mut self, iter: T) {
        self.entries.extend(iter.into_iter().map(|(n, v)| (n.into(), v.into())));
    }
}

fn content_type_for(extension: &str) -> Mime {
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => mime::TEXT_HTML,
        "txt" | "text" => mime::TEXT_PLAIN,
        "css" => mime::TEXT_CSS,
        "csv" => mime::TEXT_CSV,
        "xml" => mime::TEXT_XML,
        "js" => mime::APPLICATION_JAVASCRIPT,
        "json" => mime::APPLICATION_JSON,
        "pdf" => mime::APPLICATION_PDF,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "bmp" => mime::IMAGE_BMP,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_drops_header_injection() {
        let mut headers = Headers::new();
        headers.set("Location", "/next\r\nSet-Cookie: session=stolen");
        headers.insert("Bad Name", "x");
        headers.insert("Content-Length", "0");

        let mut dst = BytesMut::new();
        headers.encode(&mut dst);
        assert_eq!(&dst[..], b"Content-Length: 0\r\n");
    }

    #[test]
    fn lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");

        assert!(headers.has("content-type"));
        assert_eq!(headers.find("CONTENT-TYPE"), "text/plain");
        assert_eq!(headers.get("content-TYPE").unwrap(), "text/plain");
    }

    #[test]
    fn find_is_empty_and_get_fails_when_absent() {
        let headers = Headers::new();
        assert_eq!(headers.find("Host"), "");
        assert_eq!(headers.get("Host").unwrap_err().kind(), crate::protocol::ErrorKind::NotFound);
    }

    #[test]
    fn insert_keeps_duplicates_in_order() {
        let mut headers = Headers::new();
        headers.insert("Set-Cookie", "a=1");
        headers.insert("X-Other", "x");
        headers.insert("set-cookie", "b=2");

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.find("Set-Cookie"), "a=1");
        assert_eq!(headers.get_all("SET-COOKIE").collect::<Vec<_>>(), vec!["a=1", "b=2"]);
        assert_eq!(headers.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec!["Set-Cookie", "X-Other", "set-cookie"]);
    }

    #[test]
    fn set_replaces_first_and_drops_rest() {
        let mut headers: Headers = [("Connection", "keep-alive"), ("Host", "a"), ("connection", "upgrade")].into_iter().collect();
        headers.set("CONNECTION", "close");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.iter().next(), Some(("Connection", "close")));
        assert!(headers.needs_close());
    }

    #[test]
    fn remove_drops_every_value() {
        let mut headers: Headers = [("A", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        headers.remove("a");
        assert_eq!(headers.len(), 1);
        assert!(!headers.has("A"));
    }

    #[test]
    fn content_type_round_trip() {
        let mut headers = Headers::new();
        assert!(!headers.has_content_type());

        headers.set_content_type("application/json");
        assert!(headers.has_content_type());
        assert_eq!(headers.content_type(), "application/json");
    }

    #[test]
    fn guess_content_type_from_extension() {
        let mut headers = Headers::new();
        headers.guess_content_type("HTML");
        assert_eq!(headers.content_type(), "text/html");

        headers.guess_content_type("png");
        assert_eq!(headers.content_type(), "image/png");

        headers.guess_content_type("");
        assert_eq!(headers.content_type(), "application/octet-stream");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn connection_semantics() {
        let mut headers = Headers::new();
        assert!(!headers.connection_keep_alive());
        assert!(!headers.needs_close());

        headers.set("Connection", "Keep-Alive");
        assert!(headers.connection_keep_alive());
        assert!(!headers.needs_close());

        headers.set("connection", "CLOSE");
        assert!(!headers.connection_keep_alive());
        assert!(headers.needs_close());
    }

    #[test]
    fn encode_skips_empty_values() {
        let headers: Headers = [("Host", "example.com"), ("X-Empty", ""), ("Accept", "*/*")].into_iter().collect();
        let mut dst = BytesMut::new();
        headers.encode(&mut dst);
        assert_eq!(&dst[..], b"Host: example.com\r\nAccept: */*\r\n");
    }
}
