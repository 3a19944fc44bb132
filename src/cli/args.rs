//! Defines the command-line arguments for the querycheck CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure. Every flag is an
//! override: anything left unset keeps the configuration default.

use clap::Parser;
use std::path::PathBuf;

use crate::fixture::QueryKind;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "querycheck",
    version,
    about = "Runs fixture-defined query tests against an eventually-consistent query API.",
    after_help = "The API key is read from SD_API_KEY; a demo key is used when it is unset."
)]
pub struct QuerycheckArgs {
    /// Directory holding one <category>.json fixture file per query category.
    #[arg(long, value_name = "DIR")]
    pub fixtures: Option<PathBuf>,

    /// Base URL of the query API.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Pause after inserts and before retries, in seconds.
    #[arg(long, value_name = "SECS")]
    pub settle_secs: Option<u64>,

    /// Do not echo payloads or print failure diffs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Run only these query categories (comma separated or repeated).
    #[arg(long, value_enum, value_delimiter = ',', value_name = "CATEGORY")]
    pub only: Vec<QueryKind>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}
