//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment < CLI
use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::selection::DEFAULT_MAX_FILE_SIZE_BYTES;

pub const ENV_PREFIX: &str = "STREAMER_UPLOAD_";
const MAX_CONCURRENCY: usize = 64;
const MAX_RETRIES: u32 = 10;

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "streamer-upload")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("streamer-upload.toml"))
}

/// The five remote operations, used to pick a retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Begin,
    ValidateFile,
    AddFile,
    Finalize,
    Submit,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::Begin => "begin",
            Operation::ValidateFile => "validatefile",
            Operation::AddFile => "addfile",
            Operation::Finalize => "finalize",
            Operation::Submit => "submit",
        }
    }
}

/// Attempts and per-attempt timeout for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one fails
    pub retries: u32,
    /// Budget for each individual attempt
    pub timeout: Duration,
    /// Sleep before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Concurrency of the transfer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Max files in flight at once
    pub concurrency: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Control calls: begin, finalize
    pub short_ms: u64,
    /// File-bearing calls: validatefile, addfile, submit
    pub long_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            short_ms: 2_000,
            long_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub count: u32,
    pub backoff_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_file: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_file: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalize: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<u32>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            count: 1,
            backoff_ms: 200,
            begin: None,
            validate_file: None,
            add_file: None,
            finalize: None,
            submit: None,
        }
    }
}

impl RetrySettings {
    fn retries_for(&self, operation: Operation) -> u32 {
        let specific = match operation {
            Operation::Begin => self.begin,
            Operation::ValidateFile => self.validate_file,
            Operation::AddFile => self.add_file,
            Operation::Finalize => self.finalize,
            Operation::Submit => self.submit,
        };
        specific.unwrap_or(self.count)
    }

    fn all(&self) -> [(&'static str, u32); 6] {
        [
            ("count", self.count),
            ("begin", self.retries_for(Operation::Begin)),
            ("validate_file", self.retries_for(Operation::ValidateFile)),
            ("add_file", self.retries_for(Operation::AddFile)),
            ("finalize", self.retries_for(Operation::Finalize)),
            ("submit", self.retries_for(Operation::Submit)),
        ]
    }
}

/// Fully resolved application configuration after all layers merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub project_root: PathBuf,
    pub max_file_size_bytes: u64,
    pub transfer: TransferSettings,
    pub timeouts: TimeoutSettings,
    pub retry: RetrySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            project_root: PathBuf::from("/project"),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            transfer: TransferSettings::default(),
            timeouts: TimeoutSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl AppConfig {
    /// Retry budget for one operation: short timeout for control calls,
    /// long timeout for calls that carry or trigger file work.
    pub fn retry_policy(&self, operation: Operation) -> RetryPolicy {
        let timeout_ms = match operation {
            Operation::Begin | Operation::Finalize => self.timeouts.short_ms,
            Operation::ValidateFile | Operation::AddFile | Operation::Submit => {
                self.timeouts.long_ms
            }
        };

        RetryPolicy {
            retries: self.retry.retries_for(operation),
            timeout: Duration::from_millis(timeout_ms),
            backoff: Duration::from_millis(self.retry.backoff_ms),
        }
    }

    /// Validates bounds and rejects unsafe values.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.server_url.trim().is_empty(),
            "Invalid config: server_url must not be empty"
        );
        ensure!(
            self.server_url.starts_with("http://") || self.server_url.starts_with("https://"),
            "Invalid config: server_url must start with http:// or https://"
        );
        ensure!(
            self.max_file_size_bytes > 0,
            "Invalid config: max_file_size_bytes must be > 0"
        );
        ensure!(
            self.transfer.concurrency >= 1,
            "Invalid config: transfer.concurrency must be >= 1"
        );
        ensure!(
            self.transfer.concurrency <= MAX_CONCURRENCY,
            "Invalid config: transfer.concurrency must be <= {MAX_CONCURRENCY}"
        );
        ensure!(
            self.timeouts.short_ms > 0,
            "Invalid config: timeouts.short_ms must be > 0"
        );
        ensure!(
            self.timeouts.long_ms > 0,
            "Invalid config: timeouts.long_ms must be > 0"
        );
        for (name, retries) in self.retry.all() {
            ensure!(
                retries <= MAX_RETRIES,
                "Invalid config: retry.{name} must be <= {MAX_RETRIES}"
            );
        }
        Ok(())
    }
}

/// Values given on the command line, applied last.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

/// Loads config from defaults/file/env.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path();

    let config: AppConfig = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Failed to load configuration")?;

    config.validate()?;

    Ok(config)
}

/// Applies runtime overrides to a loaded config and re-validates it.
pub fn apply_overrides(mut config: AppConfig, overrides: &ConfigOverrides) -> Result<AppConfig> {
    if let Some(url) = &overrides.server_url {
        config.server_url = url.clone();
    }
    if let Some(concurrency) = overrides.concurrency {
        config.transfer.concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}
