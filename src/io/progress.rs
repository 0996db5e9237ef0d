use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq)]
pub enum TaskProgress {
    Stage(&'static str),
    Uploading { sent: u64, total: u64 },
    /// Accepted by the service but not started yet.
    Queued,
    Processing { percent: u32 },
    Downloading { label: String, done: u64, total: u64 },
    Finished,
}

type ProgressCallback = Arc<dyn Fn(&TaskProgress) + Send + Sync>;

static PROGRESS_CB: Lazy<RwLock<Option<ProgressCallback>>> = Lazy::new(|| RwLock::new(None));

pub fn set_progress_callback<F>(f: F)
where
    F: Fn(&TaskProgress) + Send + Sync + 'static,
{
    if let Ok(mut slot) = PROGRESS_CB.write() {
        *slot = Some(Arc::new(f));
    }
}

pub fn clear_progress_callback() {
    if let Ok(mut slot) = PROGRESS_CB.write() {
        *slot = None;
    }
}

pub fn emit_progress(p: TaskProgress) {
    // Clone out of the lock so a callback may itself re-register.
    let cb = PROGRESS_CB.read().ok().and_then(|slot| slot.clone());
    if let Some(cb) = cb {
        cb(&p);
    }
}
