mod render;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use stem_splitter_remote::{
    collect_all_inputs, collect_inputs, run_batch, ApiClient, BatchReport, Config,
    ExtractionLevel, Multivocal, Operation, RunOptions, SplitRequest, Splitter, Stem, TaskError,
    TaskRunner, TonalityReference, VoiceChangePresets, VoicePackTrainer,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stem-splitter-remote",
    version,
    about = "Split stems, clean voice and convert voices with a remote processing API"
)]
struct Cli {
    /// License key sent as X-License-Key (overrides config and STEM_REMOTE_LICENSE)
    #[arg(long, global = true)]
    license: Option<String>,

    /// Config file (default: platform config dir / config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Seconds between status checks
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Give up waiting for a task after this many seconds
    #[arg(long, global = true)]
    poll_timeout: Option<u64>,

    /// More log output (-v info, -vv debug). Disables the progress bar.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file (or every file in a directory) and extract a stem
    Split(SplitArgs),
    /// Convert the voice in a file using a voice pack
    ChangeVoice(ChangeVoiceArgs),
    /// List voice packs that are ready to use
    VoicePacks,
    /// Train a new voice pack from sample recordings and activate it
    TrainVoicePack(TrainArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Input files or directories
    #[arg(short, long, num_args = 1.., required = true)]
    input: Vec<PathBuf>,

    /// Name of the voice pack to create
    #[arg(long)]
    pack_name: String,
}

#[derive(Args)]
struct SplitArgs {
    /// Input file or directory
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// "voice" for voice cleaning, "music" for music removal, or an instrument stem:
    /// vocals, drum, piano, bass, electric_guitar, acoustic_guitar, synthesizer, strings, wind
    #[arg(long, default_value = "vocals")]
    stem: String,

    /// Noise cancelling level for the "voice" stem (0 mild, 1 normal, 2 aggressive)
    #[arg(long, default_value_t = 1)]
    noise_cancelling: u8,

    /// deep_extraction or clear_cut
    #[arg(long, default_value = "deep_extraction")]
    extraction_level: String,

    /// "lead_back" to separate lead and backing vocals (vocals stem only)
    #[arg(long)]
    multivocal: Option<String>,

    /// orion, perseus, phoenix or andromeda; the service picks when omitted
    #[arg(long)]
    splitter: Option<String>,

    /// Remove echo
    #[arg(long)]
    dereverb: bool,

    /// Delete the source and tracks from remote storage after download
    #[arg(long)]
    delete: bool,
}

#[derive(Args)]
struct ChangeVoiceArgs {
    /// Input file
    #[arg(short, long, conflicts_with = "uploaded_file_id", required_unless_present = "uploaded_file_id")]
    input: Option<PathBuf>,

    /// Source id of a file uploaded earlier
    #[arg(long)]
    uploaded_file_id: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Voice pack id, see the voice-packs command
    #[arg(long, default_value = "ALEX_KAYE")]
    voice_pack_id: String,

    /// Accent intensity, 0.0 keeps the source accent, 1.0 applies the pack's
    #[arg(long, default_value_t = 1.0)]
    accent: f32,

    /// source_file keeps the original pitch, voice_pack applies the pack's
    #[arg(long, default_value = "source_file")]
    tonality_reference: String,

    #[arg(long)]
    splitter: Option<String>,

    #[arg(long)]
    dereverb: bool,

    #[arg(long)]
    delete: bool,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "stem_splitter_remote=warn",
        1 => "stem_splitter_remote=info",
        _ => "stem_splitter_remote=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(p) => Some(p.clone()),
        None => Config::default_path().ok(),
    };
    let mut config = match path {
        Some(p) => Config::load_or_default(&p)
            .with_context(|| format!("Failed to load config from {}", p.display()))?,
        None => Config::default(),
    }
    .with_env_overrides();

    if let Some(license) = &cli.license {
        config.license = Some(license.clone());
    }
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }
    if let Some(secs) = cli.poll_timeout {
        config.poll_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

fn run_options(config: &Config, output: Option<PathBuf>, delete: bool) -> RunOptions {
    RunOptions {
        output_dir: output
            .or_else(|| config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(".")),
        delete_after_download: delete,
    }
}

fn split_operation(args: &SplitArgs) -> stem_splitter_remote::Result<Operation> {
    let req = SplitRequest {
        stem: Stem::parse(&args.stem)?,
        noise_cancelling: args.noise_cancelling,
        extraction_level: ExtractionLevel::parse(&args.extraction_level)?,
        multivocal: args.multivocal.as_deref().map(Multivocal::parse).transpose()?,
        splitter: args.splitter.as_deref().map(Splitter::parse).transpose()?,
        dereverb: args.dereverb,
    };
    Operation::split(&req)
}

fn change_voice_operation(args: &ChangeVoiceArgs) -> stem_splitter_remote::Result<Operation> {
    Operation::change_voice(VoiceChangePresets {
        voice_pack_id: args.voice_pack_id.clone(),
        accent: args.accent,
        tonality_reference: TonalityReference::parse(&args.tonality_reference)?,
        dereverb_enabled: args.dereverb,
        splitter: args.splitter.as_deref().map(Splitter::parse).transpose()?,
    })
}

fn task_exit_status(err: &TaskError) -> u8 {
    match err {
        TaskError::Validation(_) => 2,
        TaskError::Auth(_) => 3,
        TaskError::Network { .. } => 4,
        TaskError::Timeout { .. } => 5,
        TaskError::RemoteProcessing(_) => 6,
        _ => 1,
    }
}

fn error_exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<TaskError>().map_or(1, task_exit_status)
}

/// A lone failed file keeps its specific exit code; mixed batches exit with 1.
/// Remote delete results never count.
fn batch_exit_status(report: &BatchReport) -> u8 {
    match report.failed.as_slice() {
        [] => 0,
        [(_, err)] if report.total() == 1 => task_exit_status(err),
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let client = ApiClient::new(config.client_options())?;
    let progress_enabled = cli.verbose == 0;

    match cli.command {
        Commands::VoicePacks => {
            let packs = client.list_voice_packs()?;
            render::print_voice_packs(&packs);
            Ok(ExitCode::SUCCESS)
        }

        Commands::TrainVoicePack(args) => {
            let inputs = collect_all_inputs(&args.input)?;
            let trainer = VoicePackTrainer::new(&client).with_poll_policy(config.train_poll_policy());
            let pb = render::install_progress_bar(progress_enabled);
            let outcome = trainer.train(&inputs, &args.pack_name);
            pb.finish_and_clear();

            render::print_training(&args.pack_name, &outcome?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Split(args) => {
            let op = split_operation(&args)?;
            let inputs = collect_inputs(&args.input)?;
            if inputs.is_empty() {
                warn!(dir = %args.input.display(), "no files to process");
                return Ok(ExitCode::SUCCESS);
            }

            let runner = TaskRunner::new(&client, run_options(&config, args.output, args.delete))
                .with_poll_policy(config.poll_policy());
            let pb = render::install_progress_bar(progress_enabled);
            let report = run_batch(&runner, &inputs, &op);
            pb.finish_and_clear();

            render::print_report(&report);
            Ok(ExitCode::from(batch_exit_status(&report)))
        }

        Commands::ChangeVoice(args) => {
            let op = change_voice_operation(&args)?;
            let runner = TaskRunner::new(&client, run_options(&config, args.output, args.delete))
                .with_poll_policy(config.poll_policy());
            let pb = render::install_progress_bar(progress_enabled);

            let report = match (&args.input, &args.uploaded_file_id) {
                (Some(input), None) => run_batch(&runner, std::slice::from_ref(input), &op),
                (None, Some(source_id)) => {
                    let mut report = BatchReport::default();
                    match runner.process_source(source_id, &op) {
                        Ok(outcome) => report.succeeded.push((PathBuf::from(source_id), outcome)),
                        Err(e) => report.failed.push((PathBuf::from(source_id), e)),
                    }
                    report
                }
                _ => {
                    return Err(TaskError::Validation(
                        "specify exactly one of --input or --uploaded-file-id".into(),
                    )
                    .into())
                }
            };
            pb.finish_and_clear();

            render::print_report(&report);
            Ok(ExitCode::from(batch_exit_status(&report)))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(error_exit_status(&e))
        }
    }
}
