use crate::{
    error::{Result, TaskError},
    io::progress::{emit_progress, TaskProgress},
    types::{TaskResult, TaskStatusEntry},
};

use std::time::Duration;
use tracing::{debug, info};

/// Anything that can report the state of a remote task.
pub trait StatusSource {
    fn check(&self, task_id: &str) -> Result<TaskStatusEntry>;
}

/// Blocking wait between status checks.
pub trait Sleeper {
    fn sleep(&self, d: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_timeout(Duration::from_secs(5), Duration::from_secs(3600))
    }
}

impl PollPolicy {
    /// Enough attempts to cover `timeout` at `interval`, at least one.
    pub fn from_timeout(interval: Duration, timeout: Duration) -> Self {
        let max_attempts = if interval.is_zero() {
            1
        } else {
            let n = timeout.as_millis().div_ceil(interval.as_millis());
            n.clamp(1, u32::MAX as u128) as u32
        };
        Self {
            interval,
            max_attempts,
        }
    }

    /// Voice pack training: checked once a minute for up to six hours.
    pub fn training() -> Self {
        Self::from_timeout(Duration::from_secs(60), Duration::from_secs(6 * 3600))
    }

    /// Upper bound on the time spent sleeping by [`poll_until_done`].
    pub fn max_wait(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Task state as seen by the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Pending { progress: u32 },
    Done(TaskResult),
    Error(String),
}

impl PollState {
    pub fn from_entry(entry: TaskStatusEntry) -> PollState {
        match entry.status.as_str() {
            "success" => PollState::Done(entry.result.unwrap_or_default()),
            "progress" => PollState::Pending {
                progress: entry.progress.unwrap_or(0.0).clamp(0.0, 100.0) as u32,
            },
            "cancelled" => PollState::Error("task was cancelled".into()),
            "error" => PollState::Error(
                entry
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "task failed without an error message".into()),
            ),
            other => PollState::Error(format!("unknown task status '{other}'")),
        }
    }
}

/// Check `task_id` until it is terminal, sleeping `policy.interval` between
/// checks. At most `policy.max_attempts` checks are made and no sleep follows
/// the last one.
pub fn poll_until_done<S, Z>(
    source: &S,
    sleeper: &Z,
    task_id: &str,
    policy: PollPolicy,
) -> Result<TaskResult>
where
    S: StatusSource + ?Sized,
    Z: Sleeper + ?Sized,
{
    let mut queued_reported = false;
    let mut last_progress = None;
    let mut waited = Duration::ZERO;
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        let entry = source.check(task_id)?;
        if !queued_reported {
            if let Some(presets) = entry.presets.as_ref() {
                info!(task_id, %presets, "using settings");
            }
        }

        match PollState::from_entry(entry) {
            PollState::Done(result) => {
                emit_progress(TaskProgress::Processing { percent: 100 });
                debug!(task_id, attempt, tracks = result.tracks.len(), "task finished");
                return Ok(result);
            }
            PollState::Error(msg) => return Err(TaskError::RemoteProcessing(msg)),
            PollState::Pending { progress } => {
                if progress == 0 && !queued_reported {
                    info!(task_id, "task queued, processing...");
                    emit_progress(TaskProgress::Queued);
                } else if progress > 0 && last_progress != Some(progress) {
                    emit_progress(TaskProgress::Processing { percent: progress });
                    last_progress = Some(progress);
                }
                queued_reported = true;
            }
        }

        if attempt < attempts {
            sleeper.sleep(policy.interval);
            waited += policy.interval;
        }
    }

    Err(TaskError::Timeout { attempts, waited })
}
