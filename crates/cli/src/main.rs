//! parley CLI: inspect stored conversations and manage configuration.
//!
//! Commands:
//! - `chats list`  List stored chats, newest first
//! - `chats show`  Replay a stored chat as view entries (JSON)
//! - `chats delete`  Delete a stored chat
//! - `config show`  Print the effective configuration
//! - `config validate`  Check the configuration file
//! - `config path`  Print the configuration file path

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "parley: conversation orchestration engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect stored chats
    Chats {
        #[command(subcommand)]
        action: ChatsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ChatsAction {
    /// List stored chats
    List {
        /// Maximum number of chats to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Replay a chat as view entries
    Show {
        /// Chat id
        id: String,

        /// Render as a shared (read-only) view
        #[arg(long)]
        shared: bool,
    },

    /// Delete a chat
    Delete {
        /// Chat id
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chats { action } => match action {
            ChatsAction::List { limit } => commands::chats::list(limit).await?,
            ChatsAction::Show { id, shared } => commands::chats::show(&id, shared).await?,
            ChatsAction::Delete { id } => commands::chats::delete(&id).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
