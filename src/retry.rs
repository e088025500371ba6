//! Retry policy for the primary provider.
//!
//! The primary provider is quota-limited and usually says how long to wait.
//! [`RetryPolicy`] turns that hint (or its absence) into a delay or a refusal, and
//! [`Sleeper`] performs the wait so tests can observe it without sleeping.
//!
//! # Backoff
//!
//! ```text
//! hint <= max_delay: delay = hint
//! hint >  max_delay: no retry, the caller fails over
//! no hint:           delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=jitter)
//! ```

use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

/// Bounded retry settings for quota errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total primary attempts, including the first one.
    pub max_attempts: usize,
    /// Default backoff when the provider gives no hint. Doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound for any single wait. Longer hints are not waited out.
    pub max_delay: Duration,
    /// Random jitter added to default backoffs only.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(60),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    ///
    /// Returns `None` when the provider asks for a wait longer than
    /// `max_delay`; retrying sooner would only hit the same quota again.
    pub fn backoff(&self, attempt: usize, hint: Option<Duration>) -> Option<Duration> {
        if let Some(hint) = hint {
            return (hint <= self.max_delay).then_some(hint);
        }

        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);

        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            Some(delay)
        } else {
            Some(delay + Duration::from_millis(rng().random_range(0..=jitter_ms)))
        }
    }
}

/// Something that can suspend the current task for a while.
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl<T: Sleeper> Sleeper for &T {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

static RETRY_IN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry in ([0-9]+(?:\.[0-9]+)?)\s*s").expect("valid regex"));

/// Parse a seconds value such as `"30"`, `"30s"` or `"12.5s"`.
fn parse_seconds(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim().trim_end_matches('s');
    let secs: f64 = trimmed.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Read a `Retry-After` header value given in seconds. HTTP dates are ignored.
pub fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Extract a wait hint from a provider's error body.
///
/// Looks first for a Google RPC `RetryInfo` detail (`"retryDelay": "30s"`),
/// then for free text such as `"Please retry in 12.5s."`.
pub fn parse_retry_hint(body: &str) -> Option<Duration> {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let details = json
            .pointer("/error/details")
            .and_then(Value::as_array)
            .into_iter()
            .flatten();
        for detail in details {
            let is_retry_info = detail
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with("RetryInfo"));
            if !is_retry_info {
                continue;
            }
            if let Some(d) = detail
                .get("retryDelay")
                .and_then(Value::as_str)
                .and_then(parse_seconds)
            {
                return Some(d);
            }
        }
    }

    RETRY_IN_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_seconds(m.as_str()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested sleeps instead of sleeping.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn durations(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_hint_used_verbatim() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(1, Some(Duration::from_secs(30))), Some(Duration::from_secs(30)));
        assert_eq!(p.backoff(2, Some(Duration::from_secs(30))), Some(Duration::from_secs(30)));
        assert_eq!(p.backoff(1, Some(Duration::from_secs(60))), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_hint_beyond_max_delay_gives_up() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(1, Some(Duration::from_secs(120))), None);
        assert_eq!(p.backoff(1, Some(Duration::from_millis(60_001))), None);
    }

    #[test]
    fn test_default_backoff_doubles_and_caps() {
        let p = no_jitter();
        assert_eq!(p.backoff(1, None), Some(Duration::from_secs(15)));
        assert_eq!(p.backoff(2, None), Some(Duration::from_secs(30)));
        assert_eq!(p.backoff(3, None), Some(Duration::from_secs(60)));
        assert_eq!(p.backoff(10, None), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_default_backoff_jitter_bounded() {
        let p = RetryPolicy::default();
        for _ in 0..50 {
            let d = p.backoff(1, None).unwrap();
            assert!(d >= Duration::from_secs(15));
            assert!(d <= Duration::from_secs(15) + Duration::from_millis(250));
        }
    }

    #[test]
    fn test_parse_retry_info_detail() {
        let body = r#"{
            "error": {
                "code": 429,
                "message": "You exceeded your current quota.",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.QuotaFailure", "violations": []},
                    {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "41s"}
                ]
            }
        }"#;
        assert_eq!(parse_retry_hint(body), Some(Duration::from_secs(41)));
    }

    #[test]
    fn test_parse_retry_in_message() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded. Please retry in 12.5s."}}"#;
        assert_eq!(parse_retry_hint(body), Some(Duration::from_millis(12_500)));
        assert_eq!(
            parse_retry_hint("429 Resource exhausted, Retry in 7s"),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_parse_huge_hint_is_ignored() {
        assert_eq!(
            parse_retry_hint(r#"{"error":{"message":"Please retry in 99999999999999999999999s."}}"#),
            None
        );
        let body = r#"{"error": {"details": [
            {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "1e30s"}
        ]}}"#;
        assert_eq!(parse_retry_hint(body), None);
        assert_eq!(parse_retry_hint(r#"{"error": {"details": [
            {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "NaNs"}
        ]}}"#), None);
    }

    #[test]
    fn test_parse_no_hint() {
        assert_eq!(parse_retry_hint(r#"{"error": {"message": "quota"}}"#), None);
        assert_eq!(parse_retry_hint("not json at all"), None);
    }

    #[test]
    fn test_parse_retry_after_header() {
        assert_eq!(parse_retry_after_header(" 20 "), Some(Duration::from_secs(20)));
        assert_eq!(parse_retry_after_header("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[tokio::test]
    async fn test_recording_sleeper_does_not_block() {
        let s = testing::RecordingSleeper::default();
        s.sleep(Duration::from_secs(3600)).await;
        assert_eq!(s.durations(), vec![Duration::from_secs(3600)]);
    }
}
