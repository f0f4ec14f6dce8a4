//! Rate-limit response headers and how long to wait for them

use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use reqwest::{StatusCode, header::HeaderMap};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Rate-limit signals carried by a single response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RateLimitHeaders {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
    pub retry_after: Option<Duration>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_u64(headers, LIMIT_HEADER),
            remaining: header_u64(headers, REMAINING_HEADER),
            reset_at: header_u64(headers, RESET_HEADER)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            retry_after: header_u64(headers, RETRY_AFTER_HEADER).map(Duration::from_secs),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// 429 always; 401/403 only with an exhausted quota or a `retry-after`
    pub fn signals_rate_limit(&self, status: StatusCode) -> bool {
        match status.as_u16() {
            429 => true,
            401 | 403 => self.is_exhausted() || self.retry_after.is_some(),
            _ => false,
        }
    }

    /// Time until the window reopens, capped at `cap`
    ///
    /// `None` when the server gave nothing usable or the reset already passed;
    /// the caller then falls back to its regular backoff.
    pub fn wait(&self, now: DateTime<Utc>, cap: Duration) -> Option<Duration> {
        let wait = match self.retry_after {
            Some(retry_after) => retry_after,
            None => {
                let until_reset = self.reset_at?.signed_duration_since(now);
                if until_reset <= TimeDelta::zero() {
                    return None;
                }
                until_reset.to_std().ok()?
            },
        };
        Some(wait.min(cap))
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderName, HeaderValue};

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(HeaderName::from_static(name), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn forbidden_with_exhausted_quota_is_rate_limited() {
        let parsed = RateLimitHeaders::from_headers(&headers(&[
            (REMAINING_HEADER, "0"),
            (RESET_HEADER, "1700000000"),
        ]));
        assert!(parsed.signals_rate_limit(StatusCode::FORBIDDEN));
        assert!(parsed.signals_rate_limit(StatusCode::UNAUTHORIZED));
        assert!(!parsed.signals_rate_limit(StatusCode::NOT_FOUND));
        assert_eq!(parsed.reset_at, Utc.timestamp_opt(1_700_000_000, 0).single());
    }

    #[test]
    fn forbidden_with_quota_left_is_not_rate_limited() {
        let parsed = RateLimitHeaders::from_headers(&headers(&[(REMAINING_HEADER, "12")]));
        assert!(!parsed.signals_rate_limit(StatusCode::FORBIDDEN));
        assert!(RateLimitHeaders::default().signals_rate_limit(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn wait_runs_until_reset() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let parsed = RateLimitHeaders::from_headers(&headers(&[
            (REMAINING_HEADER, "0"),
            (RESET_HEADER, "1042"),
        ]));
        assert_eq!(parsed.wait(now, HOUR), Some(Duration::from_secs(42)));
    }

    #[test]
    fn wait_is_capped() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let parsed = RateLimitHeaders::from_headers(&headers(&[
            (REMAINING_HEADER, "0"),
            (RESET_HEADER, "999999"),
        ]));
        assert_eq!(parsed.wait(now, HOUR), Some(HOUR));
    }

    #[test]
    fn retry_after_takes_precedence() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let parsed = RateLimitHeaders::from_headers(&headers(&[
            (RETRY_AFTER_HEADER, "7"),
            (RESET_HEADER, "2000"),
        ]));
        assert_eq!(parsed.wait(now, HOUR), Some(Duration::from_secs(7)));
    }

    #[test]
    fn past_reset_falls_back_to_backoff() {
        let now = Utc.timestamp_opt(5_000, 0).unwrap();
        let parsed = RateLimitHeaders::from_headers(&headers(&[
            (REMAINING_HEADER, "0"),
            (RESET_HEADER, "4000"),
        ]));
        assert_eq!(parsed.wait(now, HOUR), None);
        assert_eq!(RateLimitHeaders::default().wait(now, HOUR), None);
    }
}
