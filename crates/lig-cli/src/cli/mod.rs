use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `lig` binary.
#[derive(Debug, Parser)]
#[command(name = "lig", version, about = "Ligature - identity-mapped object graphs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file replacing the user and project config files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["lig", "--format", "raw", "--verbose", "schema"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["lig", "check", "schema.toml", "--quiet"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Check(args) => assert_eq!(args.schema, Path::new("schema.toml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn load_takes_schema_and_payloads() {
        let cli = Cli::try_parse_from(["lig", "load", "schema.toml", "batch.jsonl", "--no-parse"])
            .expect("cli should parse");
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.schema, Path::new("schema.toml"));
                assert_eq!(args.payloads, Path::new("batch.jsonl"));
                assert!(args.no_parse);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["lig", "--format", "table", "schema"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_flag_is_copied_into_global_flags() {
        let cli = Cli::try_parse_from(["lig", "--config", "/tmp/lig.toml", "schema"])
            .expect("cli should parse");
        assert_eq!(
            cli.global_flags().config.as_deref(),
            Some(Path::new("/tmp/lig.toml"))
        );
    }
}
