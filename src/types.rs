use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashMap, path::PathBuf};

use crate::core::presets::Operation;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Remove the source and its tracks from remote storage after download.
    #[serde(default)]
    pub delete_after_download: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: ".".into(),
            delete_after_download: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Uploaded,
    Processing,
    Done,
    Error,
}

/// One remote processing request, as tracked during a single run.
#[derive(Debug, Clone)]
pub struct Task {
    pub input: Option<PathBuf>,
    pub source_id: Option<String>,
    pub task_id: Option<String>,
    pub operation: Operation,
    pub status: TaskStatus,
    pub tracks: Vec<Track>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(input: Option<PathBuf>, operation: Operation) -> Self {
        Self {
            input,
            source_id: None,
            task_id: None,
            operation,
            status: TaskStatus::Uploaded,
            tracks: Vec::new(),
            error: None,
        }
    }

    /// Name used in log lines: the input file if there is one, else the source id.
    pub fn display_name(&self) -> String {
        match (&self.input, &self.source_id) {
            (Some(p), _) => p.display().to_string(),
            (None, Some(id)) => id.clone(),
            (None, None) => "<unnamed>".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Track {
    #[serde(default)]
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TaskResult {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone)]
pub struct DownloadedTrack {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub source_id: String,
    pub task_id: String,
    pub files: Vec<DownloadedTrack>,
    /// `None` when deletion was not requested.
    pub deleted: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStartResponse {
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub result: HashMap<String, TaskStatusEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskStatusEntry {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub presets: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Progress arrives either as a number or as a numeric string ("42").
/// Anything unparseable is treated as unknown.
fn lenient_percent<'de, D>(d: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(d)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoicePack {
    pub pack_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ready_to_use: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoicePackList {
    #[serde(default)]
    pub packs: Vec<VoicePack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainStartResponse {
    pub train_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainCheckResponse {
    #[serde(default)]
    pub voice_packs: HashMap<String, TrainingEntry>,
}

/// State of one voice pack training job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingEntry {
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub pack_name: Option<String>,
    #[serde(default)]
    pub pack_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub train_id: String,
    pub pack_id: String,
    pub source_ids: Vec<String>,
    /// Whether the pack showed up as ready to use after activation.
    pub ready: bool,
}
