//! Configuration management for Postsweep
//!
//! Credentials and the acting username come from the environment. Tuning
//! knobs come from an optional TOML settings file.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::scheduler::SchedulerOptions;

pub const USERNAME_VAR: &str = "TWITTER_USERNAME";
pub const API_KEY_VAR: &str = "TWITTER_API_KEY";
pub const API_SECRET_VAR: &str = "TWITTER_API_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_VAR: &str = "TWITTER_ACCESS_TOKEN_SECRET";
pub const CONFIG_PATH_VAR: &str = "POSTSWEEP_CONFIG";

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// OAuth 1.0a user-context credentials
#[derive(Debug)]
pub struct Credentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

#[derive(Debug)]
pub struct Config {
    pub username: String,
    pub credentials: Credentials,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Pause after every successful deletion
    pub delete_interval_ms: u64,
    /// Pause after a failed deletion that was not rate limited
    pub failure_interval_ms: u64,
    /// Page size for the candidate fetch
    pub max_results: u8,
    /// Page size for the preflight timeline check
    pub preflight_page_size: u8,
    /// Give up on identity/fetch after this many rate-limit waits; unbounded when unset
    pub max_rate_limit_retries: Option<u32>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            delete_interval_ms: 5_000,
            failure_interval_ms: 10_000,
            max_results: 100,
            preflight_page_size: 5,
            max_rate_limit_retries: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Settings {
    /// Load settings from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let settings: Settings = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("schedule.max_results", self.schedule.max_results),
            ("schedule.preflight_page_size", self.schedule.preflight_page_size),
        ] {
            if !(5..=100).contains(&value) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be between 5 and 100 (got {})",
                    field, value
                ))
                .into());
            }
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(format!(
                "api.base_url must be an http(s) URL (got {})",
                self.api.base_url
            ))
            .into());
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// The username is checked before anything else, so a missing username
    /// is always the first error reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = required(&lookup, USERNAME_VAR)?;
        let username = username.trim_start_matches('@').to_string();

        let credentials = Credentials {
            api_key: required(&lookup, API_KEY_VAR)?.into(),
            api_secret: required(&lookup, API_SECRET_VAR)?.into(),
            access_token: required(&lookup, ACCESS_TOKEN_VAR)?.into(),
            access_token_secret: required(&lookup, ACCESS_TOKEN_SECRET_VAR)?.into(),
        };

        let settings = match resolve_settings_path(lookup(CONFIG_PATH_VAR))? {
            Some(path) => Settings::load_from_path(&path)?,
            None => Settings::default(),
        };

        Ok(Self {
            username,
            credentials,
            settings,
        })
    }

    /// Scheduler options derived from the username and schedule settings
    pub fn scheduler_options(&self) -> SchedulerOptions {
        let schedule = &self.settings.schedule;
        SchedulerOptions {
            username: self.username.clone(),
            delete_interval: Duration::from_millis(schedule.delete_interval_ms),
            failure_interval: Duration::from_millis(schedule.failure_interval_ms),
            max_results: schedule.max_results,
            preflight_page_size: schedule.preflight_page_size,
            max_rate_limit_retries: schedule.max_rate_limit_retries,
            dry_run: false,
        }
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingField(key.to_string()).into()),
    }
}

/// Resolve the settings file path
///
/// An explicit path must exist. The default XDG location is used only if a
/// file is actually there.
pub fn resolve_settings_path(explicit: Option<String>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(PathBuf::from(shellexpand::tilde(&path).to_string())));
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(None);
    };

    let path = config_dir.join("postsweep").join("config.toml");
    Ok(path.exists().then_some(path))
}
