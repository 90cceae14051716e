//! Runtime configuration.
//!
//! All ambient inputs (credential, endpoints, organization) are collected once
//! at startup into explicit values that are handed to the platform client and
//! the orchestration layers.
use crate::cli::RunArgs;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_ENV: &str = "API_TOKEN";
pub const API_BASE_ENV: &str = "WSRUN_API_BASE";
pub const UI_BASE_ENV: &str = "WSRUN_UI_BASE";

pub const DEFAULT_API_BASE: &str = "https://terraform.example.net/api/v2";
pub const DEFAULT_UI_BASE: &str = "https://terraform.example.net/app";

/// Connection settings for the platform client.
#[derive(Clone)]
pub struct PlatformConfig {
    pub api_base: String,
    pub ui_base: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("api_base", &self.api_base)
            .field("ui_base", &self.ui_base)
            .field("token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl PlatformConfig {
    /// Build from an environment lookup. `lookup` is `std::env::var(..).ok()`
    /// in production.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup(TOKEN_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("{TOKEN_ENV} must be set to the platform bearer token"))?;
        let base = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };
        Ok(Self {
            api_base: base(API_BASE_ENV, DEFAULT_API_BASE),
            ui_base: base(UI_BASE_ENV, DEFAULT_UI_BASE),
            token,
            request_timeout: Duration::from_secs(30),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Bounds and spacing for every wait in a workspace pass.
///
/// The poller sleeps only between attempts, so `n` attempts wait `n - 1`
/// intervals. With the defaults a run gets at most 29 × 6 s = 174 s to plan
/// and its plan at most 9 × 6 s = 54 s to report counts, on top of the
/// 5 s settle delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub run_attempts: u32,
    pub plan_attempts: u32,
    pub interval: Duration,
    /// Pause between discarding stale runs and re-checking quiescence.
    pub settle_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            run_attempts: 30,
            plan_attempts: 10,
            interval: Duration::from_secs(6),
            settle_delay: Duration::from_secs(5),
        }
    }
}

/// Everything a single execution pass needs besides the platform and clock.
#[derive(Debug, Clone)]
pub struct PassConfig {
    pub organization: String,
    pub name_pattern: Option<String>,
    pub tag: Option<String>,
    pub auto_apply: bool,
    pub review_log: PathBuf,
    pub poll: PollSettings,
}

impl PassConfig {
    pub fn from_args(args: &RunArgs) -> Self {
        Self {
            organization: args.organization.clone(),
            name_pattern: non_empty(args.name_regex.as_deref()),
            tag: non_empty(args.tag.as_deref()),
            auto_apply: args.apply,
            review_log: args.review_log.clone(),
            poll: PollSettings::default(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
