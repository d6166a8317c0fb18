//! CLI module for Neighborly.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Neighborly - a community assistant
///
/// Answers questions about your neighborhood from community posts, using
/// retrieval-augmented generation over an OpenAI-compatible provider.
#[derive(Parser, Debug)]
#[command(name = "neighborly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration, store and provider connectivity
    Doctor,

    /// Ask the community assistant a question
    Ask {
        /// The question to ask
        question: String,

        /// User the question is asked on behalf of
        #[arg(short, long, default_value = "cli", env = "NEIGHBORLY_USER")]
        user: String,
    },

    /// Generate embeddings for posts that don't have one yet
    Backfill,

    /// Import posts from a JSON file (an array of documents)
    Import {
        /// Path to the JSON file
        file: String,
    },

    /// List posts in the store
    List,

    /// Show recent interactions for a user
    History {
        /// User whose history to show
        #[arg(short, long, default_value = "cli", env = "NEIGHBORLY_USER")]
        user: String,

        /// Number of interactions to show
        #[arg(short = 'n', long, default_value = "3")]
        limit: usize,
    },

    /// Start HTTP API server for the community app
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
