//! Error types for Postsweep

use thiserror::Error;

use crate::types::RateLimitInfo;

pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl SweepError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SweepError::Config(_) => 1,
            SweepError::Platform(_) => 1,
        }
    }

    /// Rate-limit metadata, if this is a rate-limit error from the platform
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            SweepError::Platform(e) => e.rate_limit(),
            _ => None,
        }
    }

    /// Whether the platform answered "too many requests" (HTTP 429)
    pub fn is_too_many_requests(&self) -> bool {
        matches!(self, SweepError::Platform(e) if e.status() == Some(429))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        rate_limit: RateLimitInfo,
    },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Rate-limit metadata carried by a rate-limit error
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            PlatformError::RateLimit { rate_limit, .. } => Some(rate_limit),
            _ => None,
        }
    }

    /// HTTP status code, when the failure came from an HTTP response
    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::RateLimit { .. } => Some(429),
            PlatformError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
