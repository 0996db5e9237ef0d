use indicatif::{ProgressBar, ProgressStyle};
use stem_splitter_remote::{
    set_progress_callback, BatchReport, TaskProgress, TrainingOutcome, VoicePack,
};

/// Terminal progress for the workflow: one bar, reused for every file.
pub fn install_progress_bar(enabled: bool) -> ProgressBar {
    let pb = if enabled {
        ProgressBar::new(100)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} {msg:<10} [{bar:40.cyan/blue}] {percent:>3}%")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let bar = pb.clone();
    set_progress_callback(move |p| match p {
        TaskProgress::Stage(stage) => {
            bar.reset();
            bar.set_length(100);
            bar.set_message(stage.to_string());
        }
        TaskProgress::Uploading { sent, total } => {
            bar.set_length((*total).max(1));
            bar.set_position(*sent);
        }
        TaskProgress::Queued => {
            bar.set_message("queued");
            bar.println("Task queued, processing...");
        }
        TaskProgress::Processing { percent } => {
            bar.set_message("process");
            bar.set_length(100);
            bar.set_position(u64::from(*percent));
        }
        TaskProgress::Downloading { label, done, total } => {
            bar.set_message(label.clone());
            bar.set_length((*total).max(*done).max(1));
            bar.set_position(*done);
        }
        TaskProgress::Finished => {
            bar.set_message("done");
            bar.set_position(bar.length().unwrap_or(100));
        }
    });
    pb
}

pub fn print_voice_packs(packs: &[VoicePack]) {
    println!("{:<50} {:<50}", "pack_id", "name");
    println!("{}", "-".repeat(105));
    for pack in packs.iter().filter(|p| p.ready_to_use) {
        println!("{:<50} {:<50}", pack.pack_id, pack.name);
    }
}

pub fn print_report(report: &BatchReport) {
    for (input, outcome) in &report.succeeded {
        println!("{} (source_id: {})", input.display(), outcome.source_id);
        for f in &outcome.files {
            println!("  {:<16} {}", f.label, f.path.display());
        }
        if outcome.deleted == Some(false) {
            println!("  (remote copy could not be deleted)");
        }
    }
    for (input, err) in &report.failed {
        eprintln!("Cannot process the file \"{}\": {err}", input.display());
    }
    if report.total() > 1 {
        println!(
            "{} of {} files processed successfully",
            report.succeeded.len(),
            report.total()
        );
    }
}

pub fn print_training(pack_name: &str, outcome: &TrainingOutcome) {
    println!(
        "Voice pack '{pack_name}' trained from {} files (train_id: {})",
        outcome.source_ids.len(),
        outcome.train_id
    );
    println!("Voice pack ID: {}", outcome.pack_id);
    if outcome.ready {
        println!("Ready to use: change-voice --voice-pack-id {}", outcome.pack_id);
    } else {
        println!("The pack is trained but not ready to use yet; it may need to be activated manually.");
    }
}
