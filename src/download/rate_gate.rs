//! Anti-ban throttling between downloads.
//!
//! The [`RateGate`] enforces the configured pause after every downloaded item
//! and the longer pause between albums of a discography. It also accumulates
//! server-mandated backoff (Retry-After) so that sustained throttling is
//! surfaced in the logs.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tunefetch_core::download::RateGate;
//!
//! # async fn example() {
//! let gate = RateGate::new(Duration::from_secs(5), Duration::from_secs(30));
//!
//! // after each track
//! gate.pause_after_item().await;
//!
//! // after each album of a discography
//! gate.pause_between_batches().await;
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Inter-item and inter-batch wait enforcement.
///
/// Shared through `Arc` by the catalog client (which records server backoff)
/// and the pipeline/orchestrator (which wait).
#[derive(Debug)]
pub struct RateGate {
    /// Wait after each item.
    item_wait: Duration,

    /// Wait between batches (albums of a discography).
    batch_wait: Duration,

    /// Whether every wait is skipped (override auto-wait).
    disabled: bool,

    /// Total deliberate and server-mandated delay so far (in milliseconds).
    cumulative_delay_ms: AtomicU64,
}

impl RateGate {
    /// Creates a gate with the given waits.
    #[must_use]
    #[instrument(skip_all, fields(item_ms = item_wait.as_millis(), batch_ms = batch_wait.as_millis()))]
    pub fn new(item_wait: Duration, batch_wait: Duration) -> Self {
        debug!("creating rate gate");
        Self {
            item_wait,
            batch_wait,
            disabled: false,
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Creates a gate that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled rate gate");
        Self {
            item_wait: Duration::ZERO,
            batch_wait: Duration::ZERO,
            disabled: true,
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Returns whether waits are disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the per-item wait.
    #[must_use]
    pub fn item_wait(&self) -> Duration {
        self.item_wait
    }

    /// Returns the inter-batch wait.
    #[must_use]
    pub fn batch_wait(&self) -> Duration {
        self.batch_wait
    }

    /// Returns the total delay accumulated so far.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Sleeps for the per-item wait.
    pub async fn pause_after_item(&self) {
        self.pause(self.item_wait, "item").await;
    }

    /// Sleeps for the inter-batch wait.
    pub async fn pause_between_batches(&self) {
        self.pause(self.batch_wait, "batch").await;
    }

    /// Records a server-mandated delay (from a Retry-After header).
    ///
    /// The caller performs the sleep itself; the gate only tracks the total so
    /// sustained throttling is reported.
    #[instrument(skip(self), fields(delay_ms = delay.as_millis()))]
    pub fn record_server_backoff(&self, delay: Duration) {
        let cumulative = self.add_cumulative_delay(delay);
        debug!(
            cumulative_ms = cumulative.as_millis(),
            "recorded server backoff"
        );
        if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            warn!(
                cumulative_delay_secs = cumulative.as_secs(),
                "excessive server rate limiting - the catalog may be throttling this account"
            );
        }
    }

    async fn pause(&self, delay: Duration, scope: &'static str) {
        if self.disabled || delay.is_zero() {
            return;
        }
        let cumulative = self.add_cumulative_delay(delay);
        debug!(
            scope,
            delay_ms = delay.as_millis(),
            cumulative_ms = cumulative.as_millis(),
            "rate gate pause"
        );
        tokio::time::sleep(delay).await;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Integer seconds: `Retry-After: 120`
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2025 07:28:00 GMT`
///
/// Returns `None` if the value cannot be parsed. Caps excessive values at 1 hour.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tunefetch_core::download::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }

        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);

        if duration > MAX_RETRY_AFTER {
            warn!(
                seconds,
                max_seconds = MAX_RETRY_AFTER.as_secs(),
                "Retry-After exceeds maximum, capping at 1 hour"
            );
            return Some(MAX_RETRY_AFTER);
        }

        return Some(duration);
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        if let Ok(duration) = datetime.duration_since(std::time::SystemTime::now()) {
            if duration > MAX_RETRY_AFTER {
                warn!(
                    delay_secs = duration.as_secs(),
                    max_secs = MAX_RETRY_AFTER.as_secs(),
                    "Retry-After date exceeds maximum, capping at 1 hour"
                );
                return Some(MAX_RETRY_AFTER);
            }
            Some(duration)
        } else {
            debug!(header_value, "Retry-After date is in the past, returning zero");
            Some(Duration::ZERO)
        }
    } else {
        debug!(header_value, "unparseable Retry-After value");
        None
    }
}
