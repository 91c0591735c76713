//! Mock platform implementation for testing
//!
//! A scriptable stand-in for a real platform. Tests queue up the errors each
//! call should fail with, pick which post ids fail to delete, and read back
//! what the scheduler actually asked for. No credentials or network access
//! involved.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{ApiResponse, Post, RateLimitInfo, TimelineQuery, UserHandle};

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g., "mock-x")
    pub name: String,

    /// Id returned by `who_am_i` and `resolve_user`
    pub user_id: String,

    /// Timeline contents, newest first
    pub posts: Vec<Post>,

    /// Rate-limit state attached to every successful response
    pub rate_limit: RateLimitInfo,

    /// Errors `resolve_user` returns before it starts succeeding
    pub resolve_errors: VecDeque<PlatformError>,

    /// Errors `who_am_i` returns before it starts succeeding
    pub who_am_i_errors: VecDeque<PlatformError>,

    /// Errors `fetch_timeline` returns before it starts succeeding
    pub timeline_errors: VecDeque<PlatformError>,

    /// Post ids whose deletion fails, and how
    pub delete_errors: HashMap<String, PlatformError>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            user_id: "1000".to_string(),
            posts: Vec::new(),
            rate_limit: RateLimitInfo {
                limit: Some(50),
                remaining: Some(49),
                reset: None,
            },
            resolve_errors: VecDeque::new(),
            who_am_i_errors: VecDeque::new(),
            timeline_errors: VecDeque::new(),
            delete_errors: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    resolve_errors: VecDeque<PlatformError>,
    who_am_i_errors: VecDeque<PlatformError>,
    timeline_errors: VecDeque<PlatformError>,
    resolve_calls: usize,
    who_am_i_calls: usize,
    timeline_queries: Vec<TimelineQuery>,
    delete_calls: Vec<String>,
    deleted: Vec<String>,
}

/// Call log shared between a [`MockPlatform`] and the test that built it
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Number of times `resolve_user` was called
    pub fn resolve_call_count(&self) -> usize {
        self.state.lock().unwrap().resolve_calls
    }

    /// Number of times `who_am_i` was called
    pub fn who_am_i_call_count(&self) -> usize {
        self.state.lock().unwrap().who_am_i_calls
    }

    /// Every timeline query, in call order
    pub fn timeline_queries(&self) -> Vec<TimelineQuery> {
        self.state.lock().unwrap().timeline_queries.clone()
    }

    /// Every id passed to `delete_post`, in call order
    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    /// Ids whose deletion succeeded, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    handle: MockHandle,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        let handle = MockHandle::default();
        {
            let mut state = handle.state.lock().unwrap();
            state.resolve_errors = config.resolve_errors.clone();
            state.who_am_i_errors = config.who_am_i_errors.clone();
            state.timeline_errors = config.timeline_errors.clone();
        }
        Self { config, handle }
    }

    /// Create a mock platform whose timeline holds posts with these ids, newest first
    pub fn with_posts(ids: &[&str]) -> Self {
        Self::new(MockConfig {
            posts: ids.iter().map(|id| Post::new(*id)).collect(),
            ..Default::default()
        })
    }

    /// A handle for inspecting calls after the platform has been moved
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    fn user(&self) -> UserHandle {
        UserHandle::new(self.config.user_id.clone())
    }

    fn ok<T>(&self, data: T) -> Result<ApiResponse<T>> {
        Ok(ApiResponse::new(data, self.config.rate_limit.clone()))
    }
}

/// A rate-limit error whose window resets at `reset`
pub fn rate_limit_error(reset: Option<chrono::DateTime<chrono::Utc>>) -> PlatformError {
    PlatformError::RateLimit {
        message: "Too Many Requests".to_string(),
        rate_limit: RateLimitInfo {
            limit: Some(50),
            remaining: Some(0),
            reset,
        },
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn resolve_user(&self, _username: &str) -> Result<ApiResponse<UserHandle>> {
        let queued = {
            let mut state = self.handle.state.lock().unwrap();
            state.resolve_calls += 1;
            state.resolve_errors.pop_front()
        };

        match queued {
            Some(error) => Err(error.into()),
            None => self.ok(self.user()),
        }
    }

    async fn who_am_i(&self) -> Result<ApiResponse<UserHandle>> {
        let queued = {
            let mut state = self.handle.state.lock().unwrap();
            state.who_am_i_calls += 1;
            state.who_am_i_errors.pop_front()
        };

        match queued {
            Some(error) => Err(error.into()),
            None => self.ok(self.user()),
        }
    }

    async fn fetch_timeline(
        &self,
        user_id: &str,
        query: &TimelineQuery,
    ) -> Result<ApiResponse<Vec<Post>>> {
        let queued = {
            let mut state = self.handle.state.lock().unwrap();
            state.timeline_queries.push(query.clone());
            state.timeline_errors.pop_front()
        };

        if let Some(error) = queued {
            return Err(error.into());
        }

        if user_id != self.config.user_id {
            return Err(PlatformError::Http {
                status: 404,
                message: format!("Unknown user {}", user_id),
            }
            .into());
        }

        let page: Vec<Post> = self
            .config
            .posts
            .iter()
            .take(query.max_results as usize)
            .cloned()
            .collect();
        self.ok(page)
    }

    async fn delete_post(&self, post_id: &str) -> Result<ApiResponse<bool>> {
        let mut state = self.handle.state.lock().unwrap();
        state.delete_calls.push(post_id.to_string());

        if let Some(error) = self.config.delete_errors.get(post_id) {
            return Err(error.clone().into());
        }

        state.deleted.push(post_id.to_string());
        drop(state);
        self.ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::with_posts(&["3", "2", "1"]);
        let handle = platform.handle();

        assert_eq!(platform.name(), "mock");

        let me = platform.who_am_i().await.unwrap();
        assert_eq!(me.data.id, "1000");
        assert_eq!(me.rate_limit.remaining, Some(49));

        let page = platform
            .fetch_timeline("1000", &TimelineQuery::new(100))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 3);

        let deleted = platform.delete_post("2").await.unwrap();
        assert!(deleted.data);

        assert_eq!(handle.who_am_i_call_count(), 1);
        assert_eq!(handle.delete_calls(), vec!["2"]);
        assert_eq!(handle.deleted(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_mock_queued_errors_drain() {
        let platform = MockPlatform::new(MockConfig {
            who_am_i_errors: VecDeque::from([rate_limit_error(None)]),
            ..Default::default()
        });

        let err = platform.who_am_i().await.unwrap_err();
        assert!(err.is_too_many_requests());
        assert!(platform.who_am_i().await.is_ok());
        assert_eq!(platform.handle().who_am_i_call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_delete_failure_recorded() {
        let platform = MockPlatform::new(MockConfig {
            posts: vec![Post::new("2"), Post::new("1")],
            delete_errors: HashMap::from([(
                "1".to_string(),
                PlatformError::Http {
                    status: 500,
                    message: "boom".to_string(),
                },
            )]),
            ..Default::default()
        });
        let handle = platform.handle();

        assert!(platform.delete_post("1").await.is_err());
        assert!(platform.delete_post("2").await.is_ok());

        assert_eq!(handle.delete_calls(), vec!["1", "2"]);
        assert_eq!(handle.deleted(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_mock_timeline_respects_page_size() {
        let platform = MockPlatform::with_posts(&["6", "5", "4", "3", "2", "1"]);
        let page = platform
            .fetch_timeline("1000", &TimelineQuery::new(5))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(platform.handle().timeline_queries()[0].max_results, 5);
    }

    #[tokio::test]
    async fn test_mock_unknown_user() {
        let platform = MockPlatform::with_posts(&["1"]);
        let err = platform
            .fetch_timeline("999", &TimelineQuery::new(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown user"));
    }
}
