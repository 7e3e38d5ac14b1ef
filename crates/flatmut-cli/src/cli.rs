//! CLI argument parsing for the flatmut binary.
//!
//! Config flags here override every other config source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flatmut_types::{Label, MetricType};

/// Mutable flat vector index
///
/// Builds an in-memory index from a JSON vector file and runs searches,
/// deletions and recycling against it.
#[derive(Parser, Debug)]
#[command(name = "flatmut")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/flatmut/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every command that builds an index.
#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// JSON file holding an array of vectors
    #[arg(short, long)]
    pub data: PathBuf,

    /// Override the configured metric (l2, ip, l1, linf, lp:<p>, ...)
    #[arg(short, long)]
    pub metric: Option<MetricType>,

    /// Labels to delete after loading, comma separated
    #[arg(long, value_delimiter = ',')]
    pub delete: Vec<Label>,

    /// Keep deleted vectors visible to search until their slot is reused
    #[arg(long)]
    pub include_tombstones: bool,
}

/// Index commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// k nearest neighbours of each query
    Search {
        #[command(flatten)]
        index: IndexArgs,

        /// JSON file holding an array of query vectors
        #[arg(short, long)]
        queries: PathBuf,

        /// Results per query
        #[arg(short, default_value = "10")]
        k: usize,
    },

    /// Every vector within a radius of each query
    Range {
        #[command(flatten)]
        index: IndexArgs,

        /// JSON file holding an array of query vectors
        #[arg(short, long)]
        queries: PathBuf,

        /// Strict bound: below it for L2, above it for inner product
        #[arg(short, long)]
        radius: f32,
    },

    /// Delete labels, insert new vectors, and show how slots were reused
    Recycle {
        #[command(flatten)]
        index: IndexArgs,

        /// JSON file holding the vectors to insert after deletion
        #[arg(short, long)]
        insert: PathBuf,
    },

    /// Show index statistics
    Stats {
        #[command(flatten)]
        index: IndexArgs,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
