mod error;
mod types;

pub mod config;

pub mod core {
    pub mod batch;
    pub mod poller;
    pub mod presets;
    pub mod training;
    pub mod workflow;
}

pub mod api {
    pub mod client;
    pub mod registry;
}

pub mod io {
    pub mod disposition;
    pub mod net;
    pub mod paths;
    pub mod progress;
}

// Public API
pub use crate::api::client::{ApiClient, ClientOptions};
pub use crate::config::Config;
pub use crate::core::batch::{collect_all_inputs, collect_inputs, run_batch, BatchReport};
pub use crate::core::poller::{poll_until_done, PollPolicy, PollState, Sleeper, StatusSource, ThreadSleeper};
pub use crate::core::presets::{
    ExtractionLevel, Multivocal, Operation, SplitRequest, Splitter, Stem, TonalityReference,
    VoiceChangePresets,
};
pub use crate::core::training::VoicePackTrainer;
pub use crate::core::workflow::TaskRunner;
pub use crate::error::{Result, TaskError};
pub use crate::io::progress::{clear_progress_callback, set_progress_callback, TaskProgress};
pub use crate::types::{
    DownloadedTrack, ProcessOutcome, RunOptions, Task, TaskResult, TaskStatus, TaskStatusEntry,
    Track, TrainingEntry, TrainingOutcome, VoicePack,
};
