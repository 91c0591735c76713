//! Postsweep - rate-limit aware bulk deletion of your own posts
//!
//! This library provides the deletion scheduler, the wait-time rules it
//! follows when the platform rate limits it, and the platform client it
//! talks to.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{PlatformError, Result, SweepError};
pub use scheduler::{DeletionScheduler, RunOutcome, SchedulerOptions};
pub use types::{DeletionOutcome, DeletionSummary, Post, RateLimitInfo, UserHandle};
