//! Wait-time rules for rate-limited requests
//!
//! When the platform says a window is exhausted, the scheduler waits until
//! the reported reset time plus a safety margin. A missing or already-past
//! reset time falls back to a fixed floor, and no wait ever exceeds an hour.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wait used when the reset time is unknown or already past
pub const MIN_WAIT: Duration = Duration::from_secs(15 * 60);

/// Added on top of the reported reset time
pub const SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on any computed wait
pub const MAX_WAIT: Duration = Duration::from_secs(60 * 60);

/// Compute how long to wait before retrying after a rate-limit response
///
/// # Arguments
///
/// * `reset` - When the rate-limit window resets, if the platform said so
/// * `now` - The current time
///
/// # Examples
///
/// ```
/// use chrono::{Duration as ChronoDuration, Utc};
/// use libpostsweep::backoff::calculate_wait_time;
/// use std::time::Duration;
///
/// let now = Utc::now();
/// let reset = now + ChronoDuration::minutes(10);
/// assert_eq!(calculate_wait_time(Some(reset), now), Duration::from_millis(660_000));
/// ```
pub fn calculate_wait_time(reset: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    let Some(reset) = reset else {
        return MIN_WAIT;
    };

    let wait_seconds = reset.timestamp() - now.timestamp();
    if wait_seconds <= 0 {
        return MIN_WAIT;
    }

    let wait = Duration::from_secs(wait_seconds as u64) + SAFETY_MARGIN;
    wait.min(MAX_WAIT)
}
