//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    author = "neur0map",
    about = "Ask questions about local technical documentation",
    long_about = "docqa splits documentation into overlapping chunks, embeds them locally, and answers \
                  questions from the most relevant passages, optionally phrasing an answer with a local \
                  Ollama model constrained to the retrieved context."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/docqa/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the config (e.g., "fast", "offline")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Document to index; repeat to index several (replaces document.sources)
    #[arg(short, long = "source", global = true, value_name = "FILE")]
    pub sources: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the chunks most relevant to a question
    Query {
        /// Search query text
        query: String,

        /// Number of chunks to retrieve (defaults to retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the documentation
    Ask {
        /// Question to ask
        question: String,

        /// Number of context chunks to retrieve (defaults to retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Force offline mode (retrieval only, even if an LLM is configured)
        #[arg(long)]
        offline: bool,
    },

    /// Interactive question-answering session
    Chat {
        /// Number of context chunks per question (defaults to retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Retrieval only, even if an LLM is configured
        #[arg(long)]
        offline: bool,
    },

    /// Show how the configured documents are chunked
    Chunks {
        /// Show chunks in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage the persisted index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Build the index and write the snapshot
    Build {
        /// Snapshot path (defaults to index.snapshot_path or ~/.docqa/index.snapshot)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show whether the snapshot matches the current documents and settings
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section (e.g., "llm", "index")
        #[arg(long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
