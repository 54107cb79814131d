//! Sotto Command-Line Interface
//!
//! A headless CLI for local, offline speech-to-text: transcribe audio
//! files, manage the model cache, and inspect the engine without any
//! network dependency beyond model downloads.

mod colors;
mod commands;
mod exit_codes;

use clap::{Parser, Subcommand};
use exit_codes::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sotto - Local Speech-to-Text CLI
#[derive(Parser, Debug)]
#[command(name = "sotto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe an audio file
    Transcribe {
        /// Audio file (wav, mp3, ogg, flac, m4a, aac)
        file: String,

        #[command(flatten)]
        options: TranscribeArgs,
    },
    /// Manage model binaries in the local cache
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
    /// Show module and model availability
    Status,
    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
enum ModelsAction {
    /// List cached model binaries
    List,
    /// Download a model into the cache
    Fetch {
        /// Model name (e.g. ggml-base.en.bin)
        name: String,
    },
    /// Print the model cache directory
    Dir,
}

#[derive(Parser, Debug, Clone)]
pub struct TranscribeArgs {
    /// Model name or file path (defaults to the built-in candidates)
    #[arg(short, long)]
    model: Option<String>,

    /// Language code (e.g. en); auto-detect when omitted
    #[arg(short, long)]
    language: Option<String>,

    /// Translate the transcript to English
    #[arg(long)]
    translate: bool,

    /// Threads for the inference call
    #[arg(long, default_value_t = 4)]
    threads: u32,

    /// Path to the inference module library
    #[arg(long)]
    module: Option<String>,

    /// Write the normalized mono 16kHz WAV to this path as well
    #[arg(long)]
    save_audio: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Build the async runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code.as_i32());
}

/// Initialize logging: stderr always (so stdout stays pipeable), plus a
/// log file under the platform log directory on verbose runs.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let file_layer = if verbose && sotto_common::logging::ensure_log_dir().is_ok() {
        let path = sotto_common::logging::log_dir().join("sotto-cli.log");
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()
            .map(|file| {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
            })
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Transcribe { file, options } => {
            commands::transcribe(file, options, cli.json, cli.quiet).await
        }
        Commands::Models { action } => match action {
            ModelsAction::List => commands::models_list(cli.json, cli.quiet),
            ModelsAction::Fetch { name } => commands::models_fetch(name, cli.json, cli.quiet).await,
            ModelsAction::Dir => commands::models_dir(),
        },
        Commands::Status => commands::status(cli.json),
        Commands::Version => {
            commands::version(cli.json);
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify the CLI definition is valid
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    /// Test parsing 'transcribe' with defaults
    #[test]
    fn parse_transcribe_defaults() {
        let cli = Cli::try_parse_from(["sotto", "transcribe", "meeting.mp3"]).unwrap();
        match cli.command {
            Commands::Transcribe { file, options } => {
                assert_eq!(file, "meeting.mp3");
                assert!(options.model.is_none());
                assert!(options.language.is_none());
                assert!(!options.translate);
                assert_eq!(options.threads, 4);
            }
            _ => panic!("Expected Transcribe command"),
        }
    }

    /// Test parsing 'transcribe' with all options
    #[test]
    fn parse_transcribe_with_options() {
        let cli = Cli::try_parse_from([
            "sotto",
            "transcribe",
            "talk.wav",
            "-m",
            "ggml-base.en.bin",
            "-l",
            "en",
            "--translate",
            "--threads",
            "8",
            "--save-audio",
            "/tmp/normalized.wav",
        ])
        .unwrap();
        match cli.command {
            Commands::Transcribe { options, .. } => {
                assert_eq!(options.model, Some("ggml-base.en.bin".to_string()));
                assert_eq!(options.language, Some("en".to_string()));
                assert!(options.translate);
                assert_eq!(options.threads, 8);
                assert_eq!(options.save_audio, Some("/tmp/normalized.wav".to_string()));
            }
            _ => panic!("Expected Transcribe command"),
        }
    }

    /// Test parsing with global --json flag
    #[test]
    fn parse_transcribe_with_json() {
        let cli = Cli::try_parse_from(["sotto", "--json", "transcribe", "a.wav"]).unwrap();
        assert!(cli.json);
        assert!(!cli.quiet);
    }

    /// Test global flags after the subcommand
    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sotto", "status", "--json", "-q"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
    }

    /// Test parsing 'models list'
    #[test]
    fn parse_models_list() {
        let cli = Cli::try_parse_from(["sotto", "models", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Models {
                action: ModelsAction::List
            }
        ));
    }

    /// Test parsing 'models fetch'
    #[test]
    fn parse_models_fetch() {
        let cli = Cli::try_parse_from(["sotto", "models", "fetch", "ggml-tiny.en.bin"]).unwrap();
        match cli.command {
            Commands::Models {
                action: ModelsAction::Fetch { name },
            } => assert_eq!(name, "ggml-tiny.en.bin"),
            _ => panic!("Expected Models Fetch command"),
        }
    }

    /// Test parsing 'models dir'
    #[test]
    fn parse_models_dir() {
        let cli = Cli::try_parse_from(["sotto", "models", "dir"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Models {
                action: ModelsAction::Dir
            }
        ));
    }

    /// Test parsing 'status' and 'version'
    #[test]
    fn parse_status_and_version() {
        assert!(matches!(
            Cli::try_parse_from(["sotto", "status"]).unwrap().command,
            Commands::Status
        ));
        assert!(matches!(
            Cli::try_parse_from(["sotto", "version"]).unwrap().command,
            Commands::Version
        ));
    }

    /// Test invalid command returns error
    #[test]
    fn parse_invalid_command() {
        let result = Cli::try_parse_from(["sotto", "record"]);
        assert!(result.is_err());
    }

    /// Test missing required argument returns error
    #[test]
    fn parse_missing_file() {
        let result = Cli::try_parse_from(["sotto", "transcribe"]);
        assert!(result.is_err());
    }

    /// Test missing model name for fetch returns error
    #[test]
    fn parse_missing_fetch_name() {
        let result = Cli::try_parse_from(["sotto", "models", "fetch"]);
        assert!(result.is_err());
    }
}
