pub mod bots;
pub mod content;
pub mod delete;
pub mod login;
pub mod network;
pub mod search;
pub mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Skymarshal: Bluesky account management from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging for additional debugging information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to Bluesky and persist the session
    Login,

    /// Clear the persisted session
    Logout,

    /// Download the account's posts, likes, and reposts
    Load {
        /// Per-category download limit
        #[arg(long)]
        limit: Option<usize>,
        /// Re-download even when a cached export exists
        #[arg(long)]
        force: bool,
        /// Refresh engagement counts after loading
        #[arg(long)]
        hydrate: bool,
    },

    /// Show counts for the loaded dataset
    Summary,

    /// Search the loaded dataset
    Search(search::SearchArgs),

    /// Delete records by URI
    Delete {
        /// at:// URIs to delete
        uris: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Unfollow an account
    Unfollow {
        /// Handle to unfollow
        handle: String,
    },

    /// Fetch and analyze the social graph around a handle
    Network(network::NetworkArgs),

    /// Scan followers for bot/spam indicators
    Bots(bots::BotsArgs),

    /// Show or edit user settings
    Settings,

    /// Show rate limit usage for this session
    Stats,
}

pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login => login::login().await,
        Commands::Logout => login::logout().await,
        Commands::Load {
            limit,
            force,
            hydrate,
        } => content::load(limit, force, hydrate).await,
        Commands::Summary => content::summary().await,
        Commands::Search(args) => search::search(args).await,
        Commands::Delete { uris, yes } => delete::delete(uris, yes).await,
        Commands::Unfollow { handle } => delete::unfollow(&handle).await,
        Commands::Network(args) => network::network(args).await,
        Commands::Bots(args) => bots::bots(args).await,
        Commands::Settings => settings::settings().await,
        Commands::Stats => content::stats().await,
    }
}
