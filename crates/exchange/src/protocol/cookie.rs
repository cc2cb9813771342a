//! `Cookie` header lookup and `Set-Cookie` rendering.

use std::fmt;
use std::time::{Duration, SystemTime};

/// Looks `name` up in a `Cookie` header value such as `a=1; b=2`.
///
/// Only the first matching pair counts. Returns `None` when no pair has
/// that name and `Some("")` when the pair is present without a value.
pub fn lookup<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').map(str::trim).filter(|pair| !pair.is_empty()).find_map(|pair| match pair.split_once('=') {
        Some((key, value)) if key == name => Some(value),
        None if pair == name => Some(""),
        _ => None,
    })
}

/// A cookie to send with `Set-Cookie`.
///
/// ```
/// use micro_exchange::protocol::Cookie;
///
/// let cookie = Cookie::new("sid", "abc").path("/").http_only(true);
/// assert_eq!(cookie.to_string(), "sid=abc; Path=/; HttpOnly");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    expires: Option<SystemTime>,
    max_age: Option<Duration>,
    http_only: bool,
    secure: bool,
    same_site: Option<String>,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// `Strict`, `Lax` or `None`.
    pub fn same_site<S: Into<String>>(mut self, same_site: S) -> Self {
        self.same_site = Some(same_site.into());
        self
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(expires))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = &self.same_site {
            write!(f, "; SameSite={same_site}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        assert_eq!(lookup("a=1; b=2; a=3", "a"), Some("1"));
        assert_eq!(lookup("a=1; b=2; a=3", "b"), Some("2"));
        assert_eq!(lookup("a=1; b=2; a=3", "c"), None);
    }

    #[test]
    fn present_without_value() {
        assert_eq!(lookup("flag; a=1", "flag"), Some(""));
        assert_eq!(lookup("empty=; a=1", "empty"), Some(""));
    }

    #[test]
    fn value_may_contain_equals() {
        assert_eq!(lookup("token=abc==; x=1", "token"), Some("abc=="));
    }

    #[test]
    fn name_is_matched_exactly() {
        assert_eq!(lookup("session=1", "sess"), None);
        assert_eq!(lookup("Session=1", "session"), None);
    }

    #[test]
    fn render_every_attribute() {
        let cookie = Cookie::new("sid", "xyz")
            .domain("example.com")
            .path("/api")
            .expires(SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777))
            .max_age(Duration::from_secs(3600))
            .http_only(true)
            .secure(true)
            .same_site("Lax");

        assert_eq!(
            cookie.to_string(),
            "sid=xyz; Domain=example.com; Path=/api; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Max-Age=3600; HttpOnly; Secure; SameSite=Lax"
        );
    }
}
