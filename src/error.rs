use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("task did not finish after {attempts} status checks ({waited:?} spent waiting)")]
    Timeout { attempts: u32, waited: Duration },

    #[error("remote processing failed: {0}")]
    RemoteProcessing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl TaskError {
    pub fn network(message: impl Into<String>) -> Self {
        TaskError::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error kind, used in batch summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Validation(_) => "validation",
            TaskError::Auth(_) => "auth",
            TaskError::Network { .. } => "network",
            TaskError::Timeout { .. } => "timeout",
            TaskError::RemoteProcessing(_) => "remote",
            TaskError::Io(_) => "io",
            TaskError::Json(_) => "json",
            TaskError::Config(_) => "config",
            TaskError::Anyhow(_) => "other",
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(e: reqwest::Error) -> Self {
        TaskError::Network {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
