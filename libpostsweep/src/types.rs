//! Core types for Postsweep

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A post as returned by the platform's timeline endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// The account a request acts on or looks up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserHandle {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            name: None,
        }
    }
}

/// Rate-limit window state reported alongside a response or a rate-limit error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset: Option<DateTime<Utc>>,
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn or_unknown<T: ToString>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string())
        }

        write!(
            f,
            "limit={} remaining={} reset={}",
            or_unknown(&self.limit),
            or_unknown(&self.remaining),
            self.reset
                .map(|r| r.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string())
        )
    }
}

/// A reset marker as platforms hand it out: epoch seconds or an ISO-8601 string
#[derive(Debug, Clone, PartialEq)]
pub enum ResetMarker {
    EpochSeconds(i64),
    Timestamp(String),
}

impl ResetMarker {
    /// Normalize into a single time type; unparseable markers become `None`
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            ResetMarker::EpochSeconds(secs) => Utc.timestamp_opt(*secs, 0).single(),
            ResetMarker::Timestamp(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Parse a raw reset marker (a header value or a JSON field) into a timestamp
///
/// Integer strings are treated as epoch seconds, anything else as ISO-8601.
pub fn parse_reset_marker(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let marker = match raw.parse::<i64>() {
        Ok(secs) => ResetMarker::EpochSeconds(secs),
        Err(_) => ResetMarker::Timestamp(raw.to_string()),
    };
    marker.to_datetime()
}

/// Options for a timeline page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    /// Page size; the platform accepts 5..=100
    pub max_results: u8,
    pub include_created_at: bool,
}

impl TimelineQuery {
    pub fn new(max_results: u8) -> Self {
        Self {
            max_results,
            include_created_at: true,
        }
    }
}

/// A platform response paired with the rate-limit state it reported
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: RateLimitInfo,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, rate_limit: RateLimitInfo) -> Self {
        Self { data, rate_limit }
    }
}

/// Result of one deletion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Succeeded,
    Failed,
}

/// Aggregate counters for a deletion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub total_candidates: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl DeletionSummary {
    pub fn new(total_candidates: usize) -> Self {
        Self {
            total_candidates,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: DeletionOutcome) {
        match outcome {
            DeletionOutcome::Succeeded => self.deleted += 1,
            DeletionOutcome::Failed => self.failed += 1,
        }
    }

    /// Share of candidates deleted so far, rounded to the nearest percent
    pub fn percent_deleted(&self) -> u32 {
        if self.total_candidates == 0 {
            return 0;
        }
        ((self.deleted as f64 / self.total_candidates as f64) * 100.0).round() as u32
    }

    /// A failed deletion is never retried within a run
    pub fn needs_retry(&self) -> bool {
        self.failed > 0
    }
}
