//! HTTP date header value management.
//!
//! Formatting the `Date` header on every reply is wasteful when many replies
//! go out within the same second. [`DateService`] keeps the last formatted
//! value and reformats it at most once per update interval, on the first read
//! that finds it stale.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use arc_swap::ArcSwap;
use httpdate::fmt_http_date;
use once_cell::sync::Lazy;

#[derive(Debug)]
struct Cached {
    refreshed: Instant,
    value: Arc<str>,
}

/// Maintains the current HTTP date string.
#[derive(Debug)]
pub struct DateService {
    current: ArcSwap<Cached>,
    update_interval: Duration,
}

static DATE_SERVICE: Lazy<DateService> = Lazy::new(|| DateService::new_with_update_interval(Duration::from_millis(800)));

impl DateService {
    /// Returns the process-wide instance.
    pub fn get_global_instance() -> &'static DateService {
        &DATE_SERVICE
    }

    fn new_with_update_interval(update_interval: Duration) -> Self {
        Self { current: ArcSwap::from_pointee(Self::format_now()), update_interval }
    }

    fn format_now() -> Cached {
        Cached { refreshed: Instant::now(), value: fmt_http_date(SystemTime::now()).into() }
    }

    /// The current date formatted as an IMF-fixdate, e.g.
    /// `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn http_date(&self) -> Arc<str> {
        let current = self.current.load();
        if current.refreshed.elapsed() < self.update_interval {
            return Arc::clone(&current.value);
        }

        let fresh = Arc::new(Self::format_now());
        let value = Arc::clone(&fresh.value);
        self.current.store(fresh);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_an_http_date() {
        let date = DateService::get_global_instance().http_date();
        assert!(httpdate::parse_http_date(&date).is_ok());
        assert!(date.ends_with(" GMT"));
    }

    #[test]
    fn stale_value_is_refreshed() {
        let service = DateService::new_with_update_interval(Duration::ZERO);
        let first = service.current.load().refreshed;
        let _ = service.http_date();
        assert!(service.current.load().refreshed >= first);
    }
}
