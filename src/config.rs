use crate::{
    api::{client::ClientOptions, registry::DEFAULT_BASE_URL},
    core::poller::PollPolicy,
    error::{Result, TaskError},
    io::paths::default_config_path,
};

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const ENV_LICENSE: &str = "STEM_REMOTE_LICENSE";
pub const ENV_BASE_URL: &str = "STEM_REMOTE_BASE_URL";
pub const ENV_OUTPUT_DIR: &str = "STEM_REMOTE_OUTPUT_DIR";

/// Per-run settings. Precedence: defaults, then the TOML file, then
/// environment, then command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub license: Option<String>,
    pub base_url: String,
    pub output_dir: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub train_poll_interval_secs: u64,
    pub train_poll_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            license: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: None,
            poll_interval_secs: 5,
            poll_timeout_secs: 3600,
            request_timeout_secs: 30,
            download_timeout_secs: 60,
            train_poll_interval_secs: 60,
            train_poll_timeout_secs: 6 * 3600,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn check_poll_window(what: &str, interval_secs: u64, timeout_secs: u64) -> Result<()> {
    if interval_secs == 0 {
        return Err(TaskError::Validation(format!(
            "{what} interval must be at least 1 second"
        )));
    }
    if timeout_secs < interval_secs {
        return Err(TaskError::Validation(format!(
            "{what} timeout ({timeout_secs}s) is shorter than the interval ({interval_secs}s)"
        )));
    }
    Ok(())
}

impl Config {
    /// Missing fields use their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Defaults when the file does not exist; invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(TaskError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(license) = env_non_empty(ENV_LICENSE) {
            self.license = Some(license);
        }
        if let Some(url) = env_non_empty(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(dir) = env_non_empty(ENV_OUTPUT_DIR) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn default_path() -> Result<PathBuf> {
        default_config_path()
    }

    pub fn validate(&self) -> Result<()> {
        check_poll_window("poll", self.poll_interval_secs, self.poll_timeout_secs)?;
        check_poll_window(
            "training poll",
            self.train_poll_interval_secs,
            self.train_poll_timeout_secs,
        )
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from_timeout(
            Duration::from_secs(self.poll_interval_secs),
            Duration::from_secs(self.poll_timeout_secs),
        )
    }

    pub fn train_poll_policy(&self) -> PollPolicy {
        PollPolicy::from_timeout(
            Duration::from_secs(self.train_poll_interval_secs),
            Duration::from_secs(self.train_poll_timeout_secs),
        )
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            license: self.license.clone().unwrap_or_default(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
        }
    }
}
