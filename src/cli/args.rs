use std::path::PathBuf;

use clap::{Parser, Subcommand};
use streamcat::{
    config::StorageBackend,
    models::{ContentId, EpisodeId},
    store::history::DEFAULT_CONTINUE_LIMIT,
};

#[derive(Debug, Parser)]
#[command(name = "streamcat", version, about = "Browse and manage a streaming catalog")]
pub struct Cli {
    /// Backend base URL, overrides STREAMCAT_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where the session is kept: file, keyring or memory
    #[arg(long, global = true)]
    pub storage: Option<StorageBackend>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        email: String,
        #[arg(long, env = "STREAMCAT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(long, env = "STREAMCAT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List catalog contents
    List {
        #[arg(long = "type")]
        content_type: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one content with its episodes and links
    Show { id: ContentId },
    /// Show one episode
    Episode {
        content_id: ContentId,
        episode_id: EpisodeId,
    },
    /// List the episodes of a content
    Episodes { content_id: ContentId },
    /// Show the episode after the given one
    Next {
        content_id: ContentId,
        #[arg(long, default_value_t = 1)]
        season: u32,
        #[arg(long)]
        episode: u32,
    },
    /// Report watch progress in seconds
    Progress {
        content_id: ContentId,
        seconds: u32,
        #[arg(long)]
        episode: Option<EpisodeId>,
    },
    /// Upload a video file for a content or an episode
    Upload {
        content_id: ContentId,
        file: PathBuf,
        #[arg(long)]
        episode: Option<EpisodeId>,
    },
    /// Show watch history
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show contents started but not finished
    Continue {
        #[arg(long, default_value_t = DEFAULT_CONTINUE_LIMIT)]
        limit: u32,
    },
    /// Remove a watch history entry
    Forget { id: u64 },
    /// List genres
    Genres,
    /// List categories
    Categories,
}
