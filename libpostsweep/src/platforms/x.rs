//! X (formerly Twitter) platform implementation
//!
//! Talks to the v2 REST API with OAuth 1.0a user-context signing. Every
//! response's `x-rate-limit-*` headers are parsed into [`RateLimitInfo`],
//! and HTTP 429 becomes [`PlatformError::RateLimit`] carrying them.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{Config, Credentials};
use crate::error::{PlatformError, Result};
use crate::platforms::oauth::OAuthSigner;
use crate::platforms::Platform;
use crate::types::{parse_reset_marker, ApiResponse, Post, RateLimitInfo, TimelineQuery, UserHandle};

/// X API v2 client
pub struct XClient {
    http: Client,
    /// e.g. "https://api.twitter.com", no trailing slash
    base_url: String,
    signer: OAuthSigner,
}

/// `{"data": ..., "errors": [...]}` wrapper used by every v2 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
struct ApiProblem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ApiProblem {
    fn describe(&self) -> String {
        match (&self.title, &self.detail) {
            (_, Some(detail)) => detail.clone(),
            (Some(title), None) => title.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Deleted {
    deleted: bool,
}

impl XClient {
    /// Create a new X client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. "https://api.twitter.com"
    /// * `credentials` - OAuth 1.0a consumer and access token pairs
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("postsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create an X client on top of an existing HTTP client
    pub fn with_client(http: Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(credentials),
        }
    }

    /// Create an X client from loaded configuration
    pub fn from_config(config: Config) -> Result<Self> {
        Self::new(config.settings.api.base_url, config.credentials)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<ApiResponse<Envelope<T>>> {
        let url = format!("{}{}", self.base_url, path);
        let authorization = self
            .signer
            .authorization_header(method.as_str(), &url, query)?;

        let mut request = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, authorization);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            PlatformError::Network(format!(
                "Could not reach X ({}): {}. Check your internet connection.",
                context, e
            ))
        })?;

        let rate_limit = parse_rate_limit(response.headers());
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body, rate_limit, context).into());
        }

        let envelope = response.json::<Envelope<T>>().await.map_err(|e| {
            PlatformError::InvalidResponse(format!(
                "X response could not be decoded ({}): {}",
                context, e
            ))
        })?;

        Ok(ApiResponse::new(envelope, rate_limit))
    }

    async fn fetch_user(&self, path: &str, context: &str) -> Result<ApiResponse<UserHandle>> {
        let response = self.send::<UserHandle>(Method::GET, path, &[], context).await?;
        let envelope = response.data;

        match envelope.data {
            Some(user) => Ok(ApiResponse::new(user, response.rate_limit)),
            None => Err(PlatformError::InvalidResponse(format!(
                "X returned no user ({}): {}",
                context,
                describe_problems(&envelope.errors)
            ))
            .into()),
        }
    }
}

#[async_trait]
impl Platform for XClient {
    fn name(&self) -> &str {
        "x"
    }

    async fn resolve_user(&self, username: &str) -> Result<ApiResponse<UserHandle>> {
        let path = format!(
            "/2/users/by/username/{}",
            urlencoding::encode(username.trim_start_matches('@'))
        );
        self.fetch_user(&path, "resolve user").await
    }

    async fn who_am_i(&self) -> Result<ApiResponse<UserHandle>> {
        self.fetch_user("/2/users/me", "who am i").await
    }

    async fn fetch_timeline(
        &self,
        user_id: &str,
        query: &TimelineQuery,
    ) -> Result<ApiResponse<Vec<Post>>> {
        let path = format!("/2/users/{}/tweets", urlencoding::encode(user_id));
        let max_results = query.max_results.to_string();

        let mut params = vec![("max_results", max_results.as_str())];
        if query.include_created_at {
            params.push(("tweet.fields", "created_at"));
        }

        let response = self
            .send::<Vec<Post>>(Method::GET, &path, &params, "fetch timeline")
            .await?;

        // No `data` key means the user has no posts
        Ok(ApiResponse::new(
            response.data.data.unwrap_or_default(),
            response.rate_limit,
        ))
    }

    async fn delete_post(&self, post_id: &str) -> Result<ApiResponse<bool>> {
        let path = format!("/2/tweets/{}", urlencoding::encode(post_id));
        let response = self
            .send::<Deleted>(Method::DELETE, &path, &[], "delete post")
            .await?;

        let deleted = response.data.data.map(|d| d.deleted).unwrap_or(false);
        Ok(ApiResponse::new(deleted, response.rate_limit))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Read the `x-rate-limit-*` response headers
fn parse_rate_limit(headers: &HeaderMap) -> RateLimitInfo {
    RateLimitInfo {
        limit: header_str(headers, "x-rate-limit-limit").and_then(|v| v.trim().parse().ok()),
        remaining: header_str(headers, "x-rate-limit-remaining")
            .and_then(|v| v.trim().parse().ok()),
        reset: header_str(headers, "x-rate-limit-reset").and_then(parse_reset_marker),
    }
}

fn describe_problems(problems: &[ApiProblem]) -> String {
    if problems.is_empty() {
        return "no details".to_string();
    }
    problems
        .iter()
        .map(ApiProblem::describe)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Pull a human-readable message out of an error body
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        detail: Option<String>,
        #[serde(default)]
        errors: Vec<ApiProblem>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            if let Some(detail) = parsed.detail.or(parsed.title) {
                detail
            } else if !parsed.errors.is_empty() {
                describe_problems(&parsed.errors)
            } else {
                body.trim().to_string()
            }
        }
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

/// Map an unsuccessful HTTP status to PlatformError
///
/// # Error Mapping
///
/// - HTTP 401/403 → `PlatformError::Authentication`
/// - HTTP 429 → `PlatformError::RateLimit` (with the parsed rate-limit headers)
/// - Anything else → `PlatformError::Http` with the status code
fn map_status_error(
    status: StatusCode,
    body: &str,
    rate_limit: RateLimitInfo,
    context: &str,
) -> PlatformError {
    let detail = error_detail(body);

    match status.as_u16() {
        401 | 403 => PlatformError::Authentication(format!(
            "X rejected the credentials ({}): {}. \
                Suggestion: Verify the API key/secret and access token/secret, \
                and that the app has read and write permissions.",
            context, detail
        )),
        429 => PlatformError::RateLimit {
            message: format!("X rate limit exceeded ({}): {}", context, detail),
            rate_limit,
        },
        code => PlatformError::Http {
            status: code,
            message: format!("X request failed ({}): {}", context, detail),
        },
    }
}
