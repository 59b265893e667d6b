//! Constants for the download module (timeouts, rate limiting, staging files).

use std::time::Duration;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (30 seconds).
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Warning threshold for cumulative rate gate delay (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Maximum Retry-After header value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Suffix of the file being streamed.
pub const PART_SUFFIX: &str = "part";

/// Suffix of the complete, not yet post-processed stream.
pub const RAW_SUFFIX: &str = "raw";

/// Infix of the transcoder output before it is promoted to the target.
pub const STAGING_INFIX: &str = "staging";
