use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Validate a schema document and summarize its classes.
    Check(CheckArgs),
    /// Load a JSONL batch of payloads into a graph and print the result.
    Load(LoadArgs),
    /// Print the JSON Schema of schema documents.
    Schema,
}

#[derive(Clone, Debug, Args)]
pub struct CheckArgs {
    /// Schema document (`.toml` or `.json`).
    pub schema: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct LoadArgs {
    /// Schema document (`.toml` or `.json`).
    pub schema: PathBuf,
    /// JSONL file, one `{"class": ..., "data": {...}}` object per line.
    pub payloads: PathBuf,
    /// Apply payloads without running the graph parser.
    #[arg(long)]
    pub no_parse: bool,
}
