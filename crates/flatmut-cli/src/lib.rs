//! flatmut CLI library exports.
//!
//! This crate provides the `flatmut` binary, a driver that loads vectors
//! from JSON files into a mutable flat index and runs queries against it.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (search, range, recycle, stats)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, IndexArgs};
pub use commands::{
    build_index, init_logging, load_settings, print_json, range, read_vectors, recycle, search,
    stats, RecycleReport, SlotEntry,
};
