//! flatmut
//!
//! Mutable brute-force vector index driver.
//!
//! # Usage
//!
//! ```bash
//! flatmut search --data base.json --queries q.json -k 10 [--metric ip] [--delete 3,7]
//! flatmut range --data base.json --queries q.json --radius 1.5
//! flatmut recycle --data base.json --delete 0,2 --insert new.json
//! flatmut stats --data base.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/flatmut/config.toml)
//! 3. Environment variables (FLATMUT_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use flatmut_cli::{
    init_logging, load_settings, print_json, range, recycle, search, stats, Cli, Commands,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Search { index, queries, k } => {
            print_json(&search(&settings, &index, &queries, k)?)?;
        }
        Commands::Range {
            index,
            queries,
            radius,
        } => {
            print_json(&range(&settings, &index, &queries, radius)?)?;
        }
        Commands::Recycle { index, insert } => {
            print_json(&recycle(&settings, &index, &insert)?)?;
        }
        Commands::Stats { index } => {
            print_json(&stats(&settings, &index)?)?;
        }
    }

    Ok(())
}
