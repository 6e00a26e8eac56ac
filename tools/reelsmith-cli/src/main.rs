//! Reelsmith CLI: plan, render, cut and score programs from JSON requests.
//!
//! Usage:
//!   reelsmith render <REQUEST>...    Render one or more program requests
//!   reelsmith plan <REQUEST>         Resolve and schedule without encoding
//!   reelsmith cut <REQUEST>          Extract sub-clips
//!   reelsmith score <REQUEST>        Lay a music cue sheet under a video
//!   reelsmith notable <TRANSCRIPT>   Pick notable timestamps
//!   reelsmith transcribe <MEDIA>     Transcribe speech to JSON, SRT or VTT
//!   reelsmith check                  Check external tools and configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reelsmith_common::AppConfig;
use reelsmith_scheduling_core::notable::PEAK_WINDOW_SECS;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelsmith",
    about = "Timeline composition and cue scheduling for generated video programs",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render program requests to video
    Render {
        /// Render request JSON files
        #[arg(required = true)]
        requests: Vec<PathBuf>,
    },

    /// Resolve and schedule a request, printing or saving the plan
    Plan {
        /// Render request JSON file
        request: PathBuf,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip speech transcription of vocal clips
        #[arg(long)]
        no_captions: bool,
    },

    /// Extract sub-clips from a source video
    Cut {
        /// Sub-clip request JSON file
        request: PathBuf,
    },

    /// Score a video with generated music blocks
    Score {
        /// Scoring request JSON file
        request: PathBuf,
    },

    /// Pick notable timestamps from a transcript
    Notable {
        /// Transcript JSON file
        transcript: PathBuf,

        /// Media file whose energy peaks are merged in
        #[arg(long)]
        peaks: Option<PathBuf>,

        /// Join window between peaks and analysis timestamps (seconds)
        #[arg(long, default_value_t = PEAK_WINDOW_SECS)]
        window: f64,
    },

    /// Transcribe speech in a media file
    Transcribe {
        /// Audio or video file
        media: PathBuf,

        /// Spoken language code
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Output file: .json transcript, .srt or .vtt subtitles
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// One subtitle cue per word instead of per segment
        #[arg(long)]
        words: bool,
    },

    /// Check external tools and configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };
    reelsmith_common::logging::init_cli_logging(&config.logging, cli.verbose);

    match cli.command {
        Commands::Render { requests } => {
            commands::render::run(config, requests).await?;
        }
        Commands::Plan {
            request,
            output,
            no_captions,
        } => {
            commands::plan::run(&config, request, output, !no_captions)?;
        }
        Commands::Cut { request } => {
            commands::cut::run(config, request).await?;
        }
        Commands::Score { request } => {
            commands::score::run(config, request).await?;
        }
        Commands::Notable {
            transcript,
            peaks,
            window,
        } => {
            commands::notable::run(config, transcript, peaks, window).await?;
        }
        Commands::Transcribe {
            media,
            language,
            output,
            words,
        } => {
            commands::transcribe::run(&config, media, language, output, words)?;
        }
        Commands::Check => {
            commands::check::run(&config, cli.config.as_deref())?;
        }
    }

    Ok(())
}
