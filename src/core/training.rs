use crate::{
    api::client::ApiClient,
    core::poller::{poll_until_done, PollPolicy, Sleeper, StatusSource, ThreadSleeper},
    error::{Result, TaskError},
    io::progress::{emit_progress, TaskProgress},
    types::{TaskStatusEntry, TrainingOutcome},
};

use std::{cell::RefCell, path::PathBuf};
use tracing::{info, warn};

/// Adapts the training check endpoint to the task poll loop. The pack id of
/// a finished training is kept aside since task results carry only tracks.
struct TrainingStatus<'c> {
    client: &'c ApiClient,
    pack_id: RefCell<Option<String>>,
}

fn failed(message: String) -> TaskStatusEntry {
    TaskStatusEntry {
        status: "error".into(),
        error: Some(message),
        ..Default::default()
    }
}

impl StatusSource for TrainingStatus<'_> {
    fn check(&self, train_id: &str) -> Result<TaskStatusEntry> {
        let Some(entry) = self.client.check_training(train_id)? else {
            return Ok(failed(format!(
                "training {train_id} is no longer listed; it may have failed"
            )));
        };

        Ok(match entry.state.as_str() {
            "success" => match entry.pack_id {
                Some(pack_id) => {
                    *self.pack_id.borrow_mut() = Some(pack_id);
                    TaskStatusEntry {
                        status: "success".into(),
                        ..Default::default()
                    }
                }
                None => failed(format!("training {train_id} finished without a pack id")),
            },
            "error" => failed(
                entry
                    .error
                    .unwrap_or_else(|| format!("training {train_id} failed")),
            ),
            // queued or training
            _ => TaskStatusEntry {
                status: "progress".into(),
                progress: entry.progress,
                ..Default::default()
            },
        })
    }
}

/// Uploads sample recordings, trains a voice pack from them and activates it.
pub struct VoicePackTrainer<'a> {
    client: &'a ApiClient,
    policy: PollPolicy,
    sleeper: Box<dyn Sleeper + 'a>,
}

impl<'a> VoicePackTrainer<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            policy: PollPolicy::training(),
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

    /// Every file must upload; the first failure aborts.
    pub fn upload_all(&self, inputs: &[PathBuf]) -> Result<Vec<String>> {
        emit_progress(TaskProgress::Stage("upload"));
        inputs
            .iter()
            .map(|input| {
                let id = self.client.upload(input)?;
                info!(file = %input.display(), source_id = %id, "uploaded training sample");
                Ok(id)
            })
            .collect()
    }

    pub fn train(&self, inputs: &[PathBuf], pack_name: &str) -> Result<TrainingOutcome> {
        let pack_name = pack_name.trim();
        if pack_name.is_empty() {
            return Err(TaskError::Validation("voice pack name must not be empty".into()));
        }
        if inputs.is_empty() {
            return Err(TaskError::Validation("no audio files to train on".into()));
        }

        let source_ids = self.upload_all(inputs)?;

        emit_progress(TaskProgress::Stage("start"));
        let train_id = self.client.start_training(&source_ids, pack_name)?;
        info!(%train_id, pack_name, samples = source_ids.len(), "training started");

        emit_progress(TaskProgress::Stage("train"));
        let status = TrainingStatus {
            client: self.client,
            pack_id: RefCell::new(None),
        };
        poll_until_done(&status, self.sleeper.as_ref(), &train_id, self.policy)?;
        let pack_id = status.pack_id.into_inner().ok_or_else(|| {
            TaskError::RemoteProcessing(format!("training {train_id} reported no pack id"))
        })?;
        info!(%train_id, %pack_id, "training finished");

        let ready = self.activate(&pack_id);
        emit_progress(TaskProgress::Finished);
        Ok(TrainingOutcome {
            train_id,
            pack_id,
            source_ids,
            ready,
        })
    }

    /// Activation and the readiness check only warn on failure: the pack is
    /// trained either way and can be activated later.
    fn activate(&self, pack_id: &str) -> bool {
        emit_progress(TaskProgress::Stage("activate"));
        if let Err(e) = self.client.activate_voice_pack(pack_id) {
            warn!(%pack_id, error = %e, "failed to activate voice pack");
            return false;
        }
        match self.client.list_voice_packs() {
            Ok(packs) => {
                let ready = packs.iter().any(|p| p.pack_id == pack_id && p.ready_to_use);
                if !ready {
                    warn!(%pack_id, "voice pack is not ready to use yet");
                }
                ready
            }
            Err(e) => {
                warn!(%pack_id, error = %e, "failed to check voice pack status");
                false
            }
        }
    }
}
