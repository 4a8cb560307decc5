//! Batcomputer - command-line console for the access gate
//!
//! Hosts the gate against a local data directory and talks to the remote
//! record store and the completion relay.

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use batcomputer_core::{AuthError, ConsoleConfig, ConsoleError, ErrorKind, RecordKind};
use batcomputer_relay::RelayError;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Data directory used when it exists in the working directory
const LOCAL_DATA_DIR: &str = "./batcomputer_data";

/// Batcomputer - clearance-gated console
#[derive(Parser)]
#[command(name = "batcomputer")]
#[command(about = "Clearance-gated console for the Batcomputer archive")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to console state (default ./batcomputer_data, else the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with a clearance secret
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        secret: String,
    },

    /// End the current session
    Logout,

    /// Show session and lockout state
    Status,

    /// Show what navigating to a console page would do
    Route {
        /// Page path, e.g. /vault
        path: String,
    },

    /// Browse or edit a record table
    Records {
        /// modules, movies, characters, locations or technologies
        kind: RecordKind,

        #[command(subcommand)]
        action: RecordAction,
    },

    /// Browse or edit a local archive section
    Archive {
        section: ArchiveSection,

        #[command(subcommand)]
        action: RecordAction,
    },

    /// Send one message to the assistant
    Chat {
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Serve the chat relay over HTTP
    ServeRelay {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },

    /// Print an Argon2id hash for a credentials file
    HashSecret { secret: String },
}

/// Section of the local archives
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ArchiveSection {
    Movies,
    Suits,
    Characters,
    Artifacts,
    Futures,
    Timeline,
    AlphaNotes,
    /// Creator documents
    Docs,
}

#[derive(Subcommand)]
pub(crate) enum RecordAction {
    /// List rows visible at the current clearance
    List,

    /// Insert a row (ALPHA only)
    Add {
        /// Row as JSON, without id or timestamps
        #[arg(long)]
        json: String,
    },

    /// Patch a row (ALPHA only)
    Update {
        id: String,

        /// Fields to change, as a JSON object
        #[arg(long)]
        json: String,
    },

    /// Delete a row (ALPHA only)
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batcomputer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match error_kind(&e) {
                Some(kind) => eprintln!("[{}] {}", kind, e),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir);

    match cli.command {
        Commands::Login { username, secret } => commands::login(&data_dir, &username, &secret),
        Commands::Logout => commands::logout(&data_dir),
        Commands::Status => commands::status(&data_dir),
        Commands::Route { path } => commands::route(&data_dir, &path),
        Commands::Records { kind, action } => commands::records(&data_dir, kind, action).await,
        Commands::Archive { section, action } => commands::archive(&data_dir, section, action),
        Commands::Chat { message } => commands::chat(&message.join(" ")).await,
        Commands::ServeRelay { bind } => commands::serve_relay(bind).await,
        Commands::HashSecret { secret } => commands::hash_secret(&secret),
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        let local = PathBuf::from(LOCAL_DATA_DIR);
        if local.is_dir() {
            local
        } else {
            ConsoleConfig::default_data_dir()
        }
    })
}

/// Category of a library error, for the `[KIND] message` rendering
fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(e) = err.downcast_ref::<ConsoleError>() {
        return Some(e.kind());
    }
    if let Some(e) = err.downcast_ref::<AuthError>() {
        return Some(e.kind());
    }
    err.downcast_ref::<RelayError>().map(RelayError::kind)
}
