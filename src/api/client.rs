use crate::{
    api::registry::{endpoint_url, resolve_base_url, Endpoint, LICENSE_HEADER},
    core::{poller::StatusSource, presets::Operation},
    error::{Result, TaskError},
    io::{
        disposition::make_content_disposition,
        net::{download_to_dir, http_client, ProgressReader},
    },
    types::{
        CheckResponse, TaskStartResponse, TaskStatusEntry, TrainCheckResponse,
        TrainStartResponse, TrainingEntry, UploadResponse, VoicePack, VoicePackList,
    },
};

use reqwest::{
    blocking::{Body, Client, Response},
    header::CONTENT_DISPOSITION,
    StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub license: String,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: resolve_base_url(None),
            license: String::new(),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
        }
    }
}

/// Blocking client for the remote processing API.
pub struct ApiClient {
    http: Client,
    base_url: String,
    license: String,
    download_timeout: Duration,
}

impl ApiClient {
    pub fn new(opts: ClientOptions) -> Result<Self> {
        if opts.license.trim().is_empty() {
            return Err(TaskError::Auth("no license key provided".into()));
        }
        Ok(Self {
            http: http_client(opts.request_timeout)?,
            base_url: resolve_base_url(Some(&opts.base_url)),
            license: opts.license.trim().to_string(),
            download_timeout: opts.download_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<Response> {
        let url = endpoint_url(&self.base_url, endpoint);
        debug!(%url, %body, "POST");
        Ok(self
            .http
            .post(url)
            .header(LICENSE_HEADER, &self.license)
            .json(body)
            .send()?)
    }

    /// Form-encoded POST, used by the voice pack training endpoints.
    fn post_form(&self, endpoint: Endpoint, form: &[(&str, &str)]) -> Result<Response> {
        let url = endpoint_url(&self.base_url, endpoint);
        debug!(%url, ?form, "POST form");
        Ok(self
            .http
            .post(url)
            .header(LICENSE_HEADER, &self.license)
            .form(form)
            .send()?)
    }

    /// Send the file as the raw request body. Returns the remote source id.
    pub fn upload(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TaskError::Validation(format!("{} has no usable file name", path.display()))
            })?;
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let url = endpoint_url(&self.base_url, Endpoint::Upload);
        debug!(%url, file = %path.display(), size, "upload");
        let resp = self
            .http
            .post(url)
            .header(LICENSE_HEADER, &self.license)
            .header(CONTENT_DISPOSITION, make_content_disposition(file_name))
            .body(Body::sized(ProgressReader::new(file, size), size))
            .send()?;

        let parsed: UploadResponse = parse_response(resp, "upload")?;
        Ok(parsed.id)
    }

    /// Post the operation's presets to its endpoint. Returns the task id.
    pub fn start_task(&self, source_id: &str, op: &Operation) -> Result<String> {
        let body = json!({
            "source_id": source_id,
            "presets": op.presets()?,
        });
        let resp = self.post_json(op.endpoint(), &body)?;
        let parsed: TaskStartResponse = parse_response(resp, "start task")?;
        Ok(parsed.task_id)
    }

    pub fn check(&self, task_id: &str) -> Result<TaskStatusEntry> {
        let resp = self.post_json(Endpoint::Check, &json!({ "task_ids": [task_id] }))?;
        let mut parsed: CheckResponse = parse_response(resp, "check")?;
        parsed.result.remove(task_id).ok_or_else(|| {
            TaskError::RemoteProcessing(format!("task {task_id} not found in check response"))
        })
    }

    pub fn delete(&self, source_id: &str) -> Result<()> {
        let resp = self.post_json(Endpoint::Delete, &json!({ "source_id": source_id }))?;
        ensure_success(resp, "delete")?;
        Ok(())
    }

    pub fn list_voice_packs(&self) -> Result<Vec<VoicePack>> {
        let url = endpoint_url(&self.base_url, Endpoint::VoicePacks);
        let resp = self
            .http
            .post(url)
            .header(LICENSE_HEADER, &self.license)
            .send()?;
        let parsed: VoicePackList = parse_response(resp, "list voice packs")?;
        Ok(parsed.packs)
    }

    /// Start training a voice pack from already uploaded sources. Returns the train id.
    pub fn start_training(&self, source_ids: &[String], pack_name: &str) -> Result<String> {
        let ids = source_ids.join(",");
        let resp = self.post_form(Endpoint::TrainStart, &[("id", ids.as_str()), ("pack_name", pack_name)])?;
        let parsed: TrainStartResponse = parse_response(resp, "start training")?;
        Ok(parsed.train_id)
    }

    /// `None` once the service no longer lists `train_id` among active trainings.
    pub fn check_training(&self, train_id: &str) -> Result<Option<TrainingEntry>> {
        let resp = self.post_form(Endpoint::TrainCheck, &[])?;
        let mut parsed: TrainCheckResponse = parse_response(resp, "check training")?;
        Ok(parsed.voice_packs.remove(train_id))
    }

    pub fn activate_voice_pack(&self, pack_id: &str) -> Result<()> {
        let resp = self.post_form(Endpoint::Activate, &[("id", pack_id)])?;
        let _: Value = parse_response(resp, "activate voice pack")?;
        Ok(())
    }

    /// Result URLs are pre-signed, so no license header is sent.
    pub fn download(&self, url: &str, dir: &Path, fallback_name: &str, label: &str) -> Result<PathBuf> {
        download_to_dir(&self.http, url, dir, fallback_name, label, self.download_timeout)
    }
}

impl StatusSource for ApiClient {
    fn check(&self, task_id: &str) -> Result<TaskStatusEntry> {
        ApiClient::check(self, task_id)
    }
}

fn body_snippet(text: &str) -> String {
    const MAX: usize = 300;
    let text = text.trim();
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn ensure_success(resp: Response, what: &str) -> Result<String> {
    let status = resp.status();
    let text = resp.text()?;
    match status {
        s if s.is_success() => Ok(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TaskError::Auth(format!(
            "{what} rejected the license key (HTTP {}): {}",
            status.as_u16(),
            body_snippet(&text)
        ))),
        _ => Err(TaskError::Network {
            status: Some(status.as_u16()),
            message: format!("{what} failed: {}", body_snippet(&text)),
        }),
    }
}

/// Decode a JSON body, also honouring `{"status": "error", "error": "..."}`
/// payloads sent with a 2xx status.
fn parse_response<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let text = ensure_success(resp, what)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        TaskError::network(format!("{what}: malformed response ({e}): {}", body_snippet(&text)))
    })?;

    if value.get("status").and_then(Value::as_str) == Some("error") {
        let msg = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(if msg.to_lowercase().contains("license") {
            TaskError::Auth(msg)
        } else {
            TaskError::RemoteProcessing(format!("{what}: {msg}"))
        });
    }

    Ok(serde_json::from_value(value)?)
}
