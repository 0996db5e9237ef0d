use crate::{
    api::client::ApiClient,
    core::{
        poller::{poll_until_done, PollPolicy, Sleeper, ThreadSleeper},
        presets::Operation,
    },
    error::{Result, TaskError},
    io::{
        paths::{ensure_output_dir, track_file_name},
        progress::{emit_progress, TaskProgress},
    },
    types::{DownloadedTrack, ProcessOutcome, RunOptions, Task, TaskStatus},
};

use std::path::Path;
use tracing::{info, warn};

/// Drives one task at a time through upload, start, poll, download and the
/// optional remote delete.
///
/// # Example
/// ```no_run
/// use stem_splitter_remote::{
///     ApiClient, ClientOptions, Operation, RunOptions, SplitRequest, TaskRunner,
/// };
///
/// let client = ApiClient::new(ClientOptions {
///     license: "my-license-key".into(),
///     ..Default::default()
/// })?;
/// let runner = TaskRunner::new(&client, RunOptions::default());
/// let op = Operation::split(&SplitRequest::default())?;
/// let outcome = runner.process_file("song.mp3".as_ref(), &op)?;
/// for f in &outcome.files {
///     println!("{}: {}", f.label, f.path.display());
/// }
/// # Ok::<(), stem_splitter_remote::TaskError>(())
/// ```
pub struct TaskRunner<'a> {
    client: &'a ApiClient,
    opts: RunOptions,
    policy: PollPolicy,
    sleeper: Box<dyn Sleeper + 'a>,
}

impl<'a> TaskRunner<'a> {
    pub fn new(client: &'a ApiClient, opts: RunOptions) -> Self {
        Self {
            client,
            opts,
            policy: PollPolicy::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'a) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.opts
    }

    pub fn upload(&self, task: &mut Task) -> Result<()> {
        let input = task
            .input
            .clone()
            .ok_or_else(|| TaskError::Validation("task has no input file to upload".into()))?;
        if !input.is_file() {
            return Err(TaskError::Validation(format!(
                "input {} is not a readable file",
                input.display()
            )));
        }

        emit_progress(TaskProgress::Stage("upload"));
        info!(file = %input.display(), "uploading");
        let source_id = self.client.upload(&input)?;
        info!(file = %input.display(), %source_id, "uploaded");
        task.source_id = Some(source_id);
        task.status = TaskStatus::Uploaded;
        Ok(())
    }

    pub fn start_task(&self, task: &mut Task) -> Result<()> {
        let source_id = task
            .source_id
            .clone()
            .ok_or_else(|| TaskError::Validation("task has no source id".into()))?;

        emit_progress(TaskProgress::Stage("start"));
        let task_id = self.client.start_task(&source_id, &task.operation)?;
        info!(%source_id, %task_id, endpoint = task.operation.endpoint().path(), "task started");
        task.task_id = Some(task_id);
        task.status = TaskStatus::Processing;
        Ok(())
    }

    pub fn poll_status(&self, task: &mut Task) -> Result<()> {
        let task_id = task
            .task_id
            .clone()
            .ok_or_else(|| TaskError::Validation("task has not been started".into()))?;

        emit_progress(TaskProgress::Stage("process"));
        let result = poll_until_done(self.client, self.sleeper.as_ref(), &task_id, self.policy)?;

        let tracks = match task.operation.wanted_label() {
            Some(label) => {
                let kept: Vec<_> = result
                    .tracks
                    .into_iter()
                    .filter(|t| t.label == label)
                    .collect();
                if kept.is_empty() {
                    return Err(TaskError::RemoteProcessing(format!(
                        "no '{label}' track in the task result"
                    )));
                }
                kept
            }
            None => result.tracks,
        };

        task.tracks = tracks;
        task.status = TaskStatus::Done;
        Ok(())
    }

    /// One file per result URL, in the order the service returned them.
    pub fn download_results(&self, task: &Task) -> Result<Vec<DownloadedTrack>> {
        ensure_output_dir(&self.opts.output_dir)?;
        emit_progress(TaskProgress::Stage("download"));

        let mut files = Vec::with_capacity(task.tracks.len());
        for (i, track) in task.tracks.iter().enumerate() {
            let fallback = track_file_name(task.input.as_deref(), &track.label, &track.url, i);
            info!(label = %track.label, url = %track.url, "downloading track");
            let path = self
                .client
                .download(&track.url, &self.opts.output_dir, &fallback, &track.label)?;
            info!(label = %track.label, path = %path.display(), "track saved");
            files.push(DownloadedTrack {
                label: track.label.clone(),
                path,
            });
        }
        Ok(files)
    }

    /// Best effort: a failure is logged and reported as `false`.
    pub fn delete_remote(&self, source_id: &str) -> bool {
        emit_progress(TaskProgress::Stage("delete"));
        match self.client.delete(source_id) {
            Ok(()) => {
                info!(%source_id, "source and tracks deleted from remote storage");
                true
            }
            Err(e) => {
                warn!(%source_id, error = %e, "failed to delete remote source");
                false
            }
        }
    }

    pub fn process_file(&self, input: &Path, op: &Operation) -> Result<ProcessOutcome> {
        let mut task = Task::new(Some(input.to_path_buf()), op.clone());
        let res = self.upload(&mut task).and_then(|_| self.run_uploaded(&mut task));
        self.finish(task, res)
    }

    /// Same as [`process_file`](Self::process_file) for a source that was
    /// uploaded in an earlier run.
    pub fn process_source(&self, source_id: &str, op: &Operation) -> Result<ProcessOutcome> {
        let mut task = Task::new(None, op.clone());
        task.source_id = Some(source_id.to_string());
        let res = self.run_uploaded(&mut task);
        self.finish(task, res)
    }

    fn run_uploaded(&self, task: &mut Task) -> Result<Vec<DownloadedTrack>> {
        self.start_task(task)?;
        self.poll_status(task)?;
        self.download_results(task)
    }

    fn finish(&self, mut task: Task, res: Result<Vec<DownloadedTrack>>) -> Result<ProcessOutcome> {
        let files = match res {
            Ok(files) => files,
            Err(e) => {
                task.status = TaskStatus::Error;
                task.error = Some(e.to_string());
                warn!(task = %task.display_name(), error = %e, "cannot process");
                return Err(e);
            }
        };

        let source_id = task.source_id.clone().unwrap_or_default();
        let deleted = self
            .opts
            .delete_after_download
            .then(|| self.delete_remote(&source_id));

        emit_progress(TaskProgress::Finished);
        info!(task = %task.display_name(), files = files.len(), "processed");
        Ok(ProcessOutcome {
            source_id,
            task_id: task.task_id.unwrap_or_default(),
            files,
            deleted,
        })
    }
}

