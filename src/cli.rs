//! # CLI Module - Command Line Interface
//!
//! Two subcommands cover the usual workflow:
//!
//! **`run`** executes a problem described by a TOML input deck and writes
//! the result file:
//! ```bash
//! neutromc-rs run --input configs/two_slab.toml --output results/two_slab
//! ```
//!
//! **`check`** parses and validates a deck without running it, which is the
//! cheap way to catch configuration mistakes before a long job:
//! ```bash
//! neutromc-rs check --input configs/two_slab.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the transport problem described by a TOML input deck
    Run {
        /// Input deck path
        #[arg(short, long)]
        input: PathBuf,

        /// Override the output basename from the deck
        #[arg(short, long)]
        output: Option<String>,

        /// Override the rank fan-out from the deck
        #[arg(short, long)]
        ranks: Option<usize>,

        /// Dump the final stored bank (the converged fission source in
        /// eigenvalue mode) to this bincode file
        #[arg(long)]
        dump_source: Option<PathBuf>,
    },

    /// Parse and validate an input deck without running it
    Check {
        /// Input deck path
        #[arg(short, long)]
        input: PathBuf,
    },
}
