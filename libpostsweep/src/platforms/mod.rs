//! Platform abstraction and implementations
//!
//! The scheduler only ever talks to a [`Platform`]. Each call returns the
//! payload together with the rate-limit state the platform reported, and a
//! rate-limited call fails with [`PlatformError::RateLimit`] carrying the
//! same metadata.
//!
//! # Examples
//!
//! ```no_run
//! use libpostsweep::config::Config;
//! use libpostsweep::platforms::{x::XClient, Platform};
//! use libpostsweep::types::TimelineQuery;
//!
//! # async fn example() -> libpostsweep::error::Result<()> {
//! let config = Config::load()?;
//! let client = XClient::from_config(config)?;
//!
//! let me = client.who_am_i().await?;
//! let page = client.fetch_timeline(&me.data.id, &TimelineQuery::new(10)).await?;
//! println!("{} posts, {}", page.data.len(), page.rate_limit);
//! # Ok(())
//! # }
//! ```
//!
//! [`PlatformError::RateLimit`]: crate::error::PlatformError::RateLimit

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ApiResponse, Post, TimelineQuery, UserHandle};

pub mod oauth;
pub mod x;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Capability interface over a social platform's REST API
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase identifier for the platform (e.g., "x")
    fn name(&self) -> &str;

    /// Look up a user by username
    async fn resolve_user(&self, username: &str) -> Result<ApiResponse<UserHandle>>;

    /// The user the credentials belong to
    async fn who_am_i(&self) -> Result<ApiResponse<UserHandle>>;

    /// Most recent posts of a user, newest first
    ///
    /// The ordering is whatever the platform returns; implementations do not
    /// re-sort.
    async fn fetch_timeline(
        &self,
        user_id: &str,
        query: &TimelineQuery,
    ) -> Result<ApiResponse<Vec<Post>>>;

    /// Delete a post by id
    ///
    /// Returns the platform's `deleted` flag.
    async fn delete_post(&self, post_id: &str) -> Result<ApiResponse<bool>>;
}
