//! Sequential, rate-limit aware deletion of a user's posts
//!
//! The scheduler keeps the newest post and deletes everything else on the
//! first timeline page, one request at a time:
//!
//! 1. Preflight: resolve the configured username and read a small timeline
//!    page, to confirm the API is reachable before anything is deleted.
//! 2. Resolve the acting user's id (cached for the scheduler's lifetime).
//! 3. Fetch up to `max_results` posts, newest first.
//! 4. Delete every post but the first, pausing between requests.
//!
//! Identity and fetch calls that hit a rate limit wait until the window
//! resets (see [`calculate_wait_time`]) and try again. Deletions are never
//! retried; a failed deletion is counted and the loop moves on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use humantime::format_duration;
use tracing::{debug, error, info, warn};

use crate::backoff::calculate_wait_time;
use crate::clock::Clock;
use crate::error::Result;
use crate::platforms::Platform;
use crate::types::{
    ApiResponse, DeletionOutcome, DeletionSummary, Post, RateLimitInfo, TimelineQuery,
};

/// Tuning for a deletion run
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOptions {
    /// Username checked during preflight
    pub username: String,
    /// Pause after every successful deletion
    pub delete_interval: Duration,
    /// Pause after a failed deletion that was not rate limited
    pub failure_interval: Duration,
    /// How many recent posts to fetch as candidates (5..=100)
    pub max_results: u8,
    /// Page size for the preflight timeline read (5..=100)
    pub preflight_page_size: u8,
    /// Give up on identity/fetch after this many rate-limit waits; `None` retries forever
    pub max_rate_limit_retries: Option<u32>,
    /// List candidates without deleting them
    pub dry_run: bool,
}

impl SchedulerOptions {
    pub fn new(username: impl Into<String>) -> Self {
        let delete_interval = Duration::from_millis(5_000);
        Self {
            username: username.into(),
            delete_interval,
            failure_interval: delete_interval * 2,
            max_results: 100,
            preflight_page_size: 5,
            max_rate_limit_retries: None,
            dry_run: false,
        }
    }
}

/// How a call to [`DeletionScheduler::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The preflight check failed; nothing was deleted
    PreflightFailed,
    /// Zero or one post fetched; the newest post is always kept
    NothingToDelete { fetched: usize },
    /// Dry run: these ids would have been deleted
    DryRun { candidates: Vec<String> },
    /// Every candidate was attempted once
    Completed(DeletionSummary),
    /// Identity resolution or the fetch failed with a non rate-limit error
    Aborted,
}

pub struct DeletionScheduler {
    platform: Box<dyn Platform>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
    /// First successful identity lookup wins
    user_id: Option<String>,
    summary: DeletionSummary,
}

impl DeletionScheduler {
    /// Create a new scheduler
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use libpostsweep::platforms::mock::MockPlatform;
    /// use libpostsweep::{DeletionScheduler, SchedulerOptions, SystemClock};
    ///
    /// # async fn example() {
    /// let platform = MockPlatform::with_posts(&["3", "2", "1"]);
    /// let mut scheduler = DeletionScheduler::new(
    ///     Box::new(platform),
    ///     Arc::new(SystemClock),
    ///     SchedulerOptions::new("someone"),
    /// );
    /// scheduler.run().await;
    /// # }
    /// ```
    pub fn new(
        platform: Box<dyn Platform>,
        clock: Arc<dyn Clock>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            platform,
            clock,
            options,
            user_id: None,
            summary: DeletionSummary::default(),
        }
    }

    /// Counters for the current (or last) run; zero unless it reached the deletion loop
    pub fn summary(&self) -> DeletionSummary {
        self.summary
    }

    /// Run one full deletion pass
    ///
    /// Never fails: every error is logged and reflected in the returned
    /// [`RunOutcome`].
    pub async fn run(&mut self) -> RunOutcome {
        info!(
            platform = self.platform.name(),
            username = %self.options.username,
            dry_run = self.options.dry_run,
            "Starting deletion run"
        );
        self.summary = DeletionSummary::default();

        if let Err(e) = self.preflight().await {
            error!("Preflight check failed: {}", e);
            if let Some(rate_limit) = e.rate_limit() {
                error!("Rate limit state at failure: {}", rate_limit);
            }
            error!("No posts were deleted");
            return RunOutcome::PreflightFailed;
        }

        match self.sweep().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Deletion run aborted: {}", e);
                RunOutcome::Aborted
            }
        }
    }

    /// Confirm the API answers for the configured user before deleting anything
    ///
    /// Rate-limit errors are reported, not waited out.
    pub async fn preflight(&self) -> Result<()> {
        let user = self.platform.resolve_user(&self.options.username).await?;
        info!(
            "Preflight: @{} resolves to user id {}",
            self.options.username, user.data.id
        );
        log_rate_limit("resolve user", &user.rate_limit);

        let page = self
            .platform
            .fetch_timeline(
                &user.data.id,
                &TimelineQuery::new(self.options.preflight_page_size),
            )
            .await?;
        info!("Preflight: timeline returned {} post(s)", page.data.len());
        if let (Some(remaining), Some(limit)) = (page.rate_limit.remaining, page.rate_limit.limit)
        {
            info!("Preflight: {}/{} timeline requests left in window", remaining, limit);
        }

        Ok(())
    }

    async fn sweep(&mut self) -> Result<RunOutcome> {
        let user_id = self.user_id().await?;
        let posts = self.fetch_posts(&user_id).await?;

        let candidates = select_candidates(&posts);
        if candidates.is_empty() {
            info!(
                "Fetched {} post(s); nothing to delete (the newest post is kept)",
                posts.len()
            );
            return Ok(RunOutcome::NothingToDelete {
                fetched: posts.len(),
            });
        }

        info!(
            "Keeping newest post {}; {} candidate(s) to delete",
            posts[0].id,
            candidates.len()
        );

        if self.options.dry_run {
            for post in candidates {
                info!("Dry run: would delete post {}", post.id);
            }
            return Ok(RunOutcome::DryRun {
                candidates: candidates.iter().map(|p| p.id.clone()).collect(),
            });
        }

        let summary = self.delete_candidates(candidates).await;

        info!(
            "Deletion finished: {} deleted, {} failed",
            summary.deleted, summary.failed
        );
        if summary.needs_retry() {
            warn!(
                "{} post(s) could not be deleted; run again to retry them",
                summary.failed
            );
        }

        Ok(RunOutcome::Completed(summary))
    }

    /// The acting user's id, looked up once and cached
    pub async fn user_id(&mut self) -> Result<String> {
        if let Some(id) = &self.user_id {
            return Ok(id.clone());
        }

        let platform = self.platform.as_ref();
        let me = self
            .retry_rate_limited("who am i", || platform.who_am_i())
            .await?;

        let id = self.user_id.get_or_insert(me.id).clone();
        debug!("Acting user id: {}", id);
        Ok(id)
    }

    /// Up to `max_results` most recent posts of `user_id`, in platform order
    pub async fn fetch_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        let platform = self.platform.as_ref();
        let query = TimelineQuery::new(self.options.max_results);

        let posts = self
            .retry_rate_limited("fetch timeline", || platform.fetch_timeline(user_id, &query))
            .await?;

        info!("Fetched {} post(s)", posts.len());
        Ok(posts)
    }

    /// Attempt each candidate exactly once, in order
    pub async fn delete_candidates(&mut self, candidates: &[Post]) -> DeletionSummary {
        self.summary = DeletionSummary::new(candidates.len());

        for post in candidates {
            let outcome = self.delete_one(post).await;
            self.summary.record(outcome);

            if outcome == DeletionOutcome::Succeeded {
                info!(
                    "Deleted post {} ({}/{}, {}%)",
                    post.id,
                    self.summary.deleted,
                    self.summary.total_candidates,
                    self.summary.percent_deleted()
                );
                self.clock.sleep(self.options.delete_interval).await;
            }
        }

        self.summary
    }

    async fn delete_one(&self, post: &Post) -> DeletionOutcome {
        match self.platform.delete_post(&post.id).await {
            Ok(response) => {
                log_rate_limit("delete post", &response.rate_limit);
                if !response.data {
                    debug!("Platform reported post {} as not deleted", post.id);
                }
                DeletionOutcome::Succeeded
            }
            Err(e) => {
                warn!("Failed to delete post {}: {}", post.id, e);

                let wait = if e.is_too_many_requests() {
                    // Waits on the post's own creation time, not the error's reset.
                    // A past timestamp always lands on the floor wait.
                    let wait = calculate_wait_time(post.created_at, self.clock.now());
                    warn!(
                        "Rate limited while deleting; waiting {} before the next post",
                        format_duration(wait)
                    );
                    wait
                } else {
                    self.options.failure_interval
                };

                self.clock.sleep(wait).await;
                DeletionOutcome::Failed
            }
        }
    }

    /// Call `operation` until it stops failing with a rate-limit error
    ///
    /// Any other error is returned immediately.
    async fn retry_rate_limited<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>>>,
    {
        let mut waits = 0u32;

        loop {
            let err = match operation().await {
                Ok(response) => {
                    log_rate_limit(label, &response.rate_limit);
                    return Ok(response.data);
                }
                Err(e) => e,
            };

            if !err.is_too_many_requests() {
                return Err(err);
            }
            // A bare HTTP 429 carries no headers; it waits the floor
            let rate_limit = err.rate_limit().cloned().unwrap_or_default();

            if let Some(max) = self.options.max_rate_limit_retries {
                if waits >= max {
                    warn!(
                        "Rate limited on {} after {} wait(s); giving up",
                        label, waits
                    );
                    return Err(err);
                }
            }

            let wait = calculate_wait_time(rate_limit.reset, self.clock.now());
            waits += 1;
            warn!(
                "Rate limited on {} ({}); waiting {} before retry #{}",
                label,
                rate_limit,
                format_duration(wait),
                waits
            );
            self.clock.sleep(wait).await;
        }
    }
}

/// Every post except the first (newest); empty for zero or one post
pub fn select_candidates(posts: &[Post]) -> &[Post] {
    if posts.len() <= 1 {
        &[]
    } else {
        &posts[1..]
    }
}

fn log_rate_limit(label: &str, rate_limit: &RateLimitInfo) {
    debug!("Rate limit after {}: {}", label, rate_limit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::PlatformError;
    use crate::platforms::mock::{rate_limit_error, MockConfig, MockPlatform};
    use chrono::{TimeZone, Utc};
    use std::collections::{HashMap, VecDeque};

    fn start() -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn scheduler(platform: MockPlatform, clock: &ManualClock) -> DeletionScheduler {
        DeletionScheduler::new(
            Box::new(platform),
            Arc::new(clock.clone()),
            SchedulerOptions::new("sweeper"),
        )
    }

    #[test]
    fn test_select_candidates() {
        assert!(select_candidates(&[]).is_empty());
        assert!(select_candidates(&[Post::new("1")]).is_empty());

        let posts = vec![Post::new("3"), Post::new("2"), Post::new("1")];
        let ids: Vec<&str> = select_candidates(&posts)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_default_options() {
        let options = SchedulerOptions::new("sweeper");
        assert_eq!(options.delete_interval, Duration::from_millis(5_000));
        assert_eq!(options.failure_interval, Duration::from_millis(10_000));
        assert_eq!(options.max_results, 100);
        assert_eq!(options.max_rate_limit_retries, None);
    }

    #[tokio::test]
    async fn test_user_id_is_cached() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::with_posts(&[]);
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);

        assert_eq!(scheduler.user_id().await.unwrap(), "1000");
        assert_eq!(scheduler.user_id().await.unwrap(), "1000");
        assert_eq!(handle.who_am_i_call_count(), 1);
    }

    #[tokio::test]
    async fn test_user_id_retries_after_rate_limit() {
        let clock = ManualClock::new(start());
        let reset = start() + chrono::Duration::minutes(10);
        let platform = MockPlatform::new(MockConfig {
            who_am_i_errors: VecDeque::from([rate_limit_error(Some(reset))]),
            ..Default::default()
        });
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);

        assert_eq!(scheduler.user_id().await.unwrap(), "1000");
        assert_eq!(handle.who_am_i_call_count(), 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(660_000)]);
    }

    #[tokio::test]
    async fn test_user_id_retries_after_bare_http_429() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            who_am_i_errors: VecDeque::from([PlatformError::Http {
                status: 429,
                message: "Too Many Requests".to_string(),
            }]),
            ..Default::default()
        });
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);

        assert_eq!(scheduler.user_id().await.unwrap(), "1000");
        assert_eq!(handle.who_am_i_call_count(), 2);
        // No reset header to go on, so the floor applies
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(900_000)]);
    }

    #[tokio::test]
    async fn test_user_id_other_errors_propagate() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            who_am_i_errors: VecDeque::from([PlatformError::Authentication(
                "bad token".to_string(),
            )]),
            ..Default::default()
        });
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);

        let err = scheduler.user_id().await.unwrap_err();
        assert!(err.to_string().contains("bad token"));
        assert_eq!(handle.who_am_i_call_count(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_posts_retries_with_floor_when_reset_unknown() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            posts: vec![Post::new("2"), Post::new("1")],
            timeline_errors: VecDeque::from([rate_limit_error(None), rate_limit_error(None)]),
            ..Default::default()
        });
        let handle = platform.handle();
        let scheduler = scheduler(platform, &clock);

        let posts = scheduler.fetch_posts("1000").await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(handle.timeline_queries().len(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(900), Duration::from_secs(900)]
        );
        assert!(handle
            .timeline_queries()
            .iter()
            .all(|q| q.max_results == 100 && q.include_created_at));
    }

    #[tokio::test]
    async fn test_bounded_retries_give_up() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            who_am_i_errors: VecDeque::from(vec![rate_limit_error(None); 5]),
            ..Default::default()
        });
        let handle = platform.handle();
        let mut options = SchedulerOptions::new("sweeper");
        options.max_rate_limit_retries = Some(2);
        let mut scheduler =
            DeletionScheduler::new(Box::new(platform), Arc::new(clock.clone()), options);

        let err = scheduler.user_id().await.unwrap_err();
        assert!(err.is_too_many_requests());
        assert_eq!(handle.who_am_i_call_count(), 3);
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_loop_sleeps_after_success_and_failure() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            delete_errors: HashMap::from([(
                "b".to_string(),
                PlatformError::Http {
                    status: 500,
                    message: "server error".to_string(),
                },
            )]),
            ..Default::default()
        });
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);

        let candidates = vec![Post::new("a"), Post::new("b"), Post::new("c")];
        let summary = scheduler.delete_candidates(&candidates).await;

        assert_eq!(handle.delete_calls(), vec!["a", "b", "c"]);
        assert_eq!(summary.deleted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(5_000),
                Duration::from_millis(10_000),
                Duration::from_millis(5_000),
            ]
        );
        assert_eq!(scheduler.summary(), summary);
    }

    #[tokio::test]
    async fn test_delete_rate_limit_waits_on_post_created_at() {
        let clock = ManualClock::new(start());
        // Reset far in the future; ignored by the deletion loop
        let error_reset = start() + chrono::Duration::minutes(10);
        let platform = MockPlatform::new(MockConfig {
            delete_errors: HashMap::from([("old".to_string(), rate_limit_error(Some(error_reset)))]),
            ..Default::default()
        });
        let mut scheduler = scheduler(platform, &clock);

        let created = start() - chrono::Duration::days(30);
        let candidates = vec![Post::new("old").with_created_at(created)];
        let summary = scheduler.delete_candidates(&candidates).await;

        assert_eq!(summary.failed, 1);
        // The post's creation time is in the past, so the floor applies
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(900_000)]);
    }

    #[tokio::test]
    async fn test_delete_http_429_counts_as_rate_limit() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            delete_errors: HashMap::from([(
                "x".to_string(),
                PlatformError::Http {
                    status: 429,
                    message: "Too Many Requests".to_string(),
                },
            )]),
            ..Default::default()
        });
        let mut scheduler = scheduler(platform, &clock);

        scheduler.delete_candidates(&[Post::new("x")]).await;
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(900_000)]);
    }

    #[tokio::test]
    async fn test_preflight_rate_limit_not_retried() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::new(MockConfig {
            posts: vec![Post::new("2"), Post::new("1")],
            resolve_errors: VecDeque::from([rate_limit_error(None)]),
            ..Default::default()
        });
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);

        assert_eq!(scheduler.run().await, RunOutcome::PreflightFailed);
        assert_eq!(handle.resolve_call_count(), 1);
        assert_eq!(handle.who_am_i_call_count(), 0);
        assert!(handle.delete_calls().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_uses_small_page() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::with_posts(&["1"]);
        let handle = platform.handle();
        let scheduler = scheduler(platform, &clock);

        scheduler.preflight().await.unwrap();
        assert_eq!(handle.resolve_call_count(), 1);
        assert_eq!(handle.timeline_queries()[0].max_results, 5);
    }

    #[tokio::test]
    async fn test_dry_run_deletes_nothing() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::with_posts(&["3", "2", "1"]);
        let handle = platform.handle();
        let mut options = SchedulerOptions::new("sweeper");
        options.dry_run = true;
        let mut scheduler =
            DeletionScheduler::new(Box::new(platform), Arc::new(clock.clone()), options);

        let outcome = scheduler.run().await;

        assert_eq!(
            outcome,
            RunOutcome::DryRun {
                candidates: vec!["2".to_string(), "1".to_string()]
            }
        );
        assert!(handle.delete_calls().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_run() {
        let clock = ManualClock::new(start());
        let platform = MockPlatform::with_posts(&["2", "1"]);
        let handle = platform.handle();
        let mut scheduler = scheduler(platform, &clock);
        // Cache a user id the platform does not know, so the fetch fails
        scheduler.user_id = Some("999".to_string());

        assert_eq!(scheduler.run().await, RunOutcome::Aborted);
        assert!(handle.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_summary_resets_at_start_of_each_run() {
        let clock = ManualClock::new(start());
        let mut scheduler = scheduler(MockPlatform::with_posts(&["3", "2", "1"]), &clock);

        scheduler.run().await;
        assert_eq!(scheduler.summary().deleted, 2);

        scheduler.options.dry_run = true;
        assert!(matches!(scheduler.run().await, RunOutcome::DryRun { .. }));
        assert_eq!(scheduler.summary(), DeletionSummary::default());

        scheduler.options.dry_run = false;
        scheduler.run().await;
        assert_eq!(scheduler.summary().deleted, 2);

        scheduler.user_id = Some("999".to_string());
        assert_eq!(scheduler.run().await, RunOutcome::Aborted);
        assert_eq!(scheduler.summary(), DeletionSummary::default());
    }
}
