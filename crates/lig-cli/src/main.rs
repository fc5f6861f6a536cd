use anyhow::Context;
use clap::Parser;
use lig_config::LigConfig;

mod cli;
mod commands;
mod output;

fn main() {
    if let Err(error) = run() {
        eprintln!("lig error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let flags = cli.global_flags();

    let config = match flags.config.as_deref() {
        Some(path) => LigConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => LigConfig::load_with_dotenv().context("failed to load ligature config")?,
    };
    init_tracing(&config, flags.quiet, flags.verbose)?;

    commands::dispatch(cli.command, &flags, &config)
}

fn init_tracing(config: &LigConfig, quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        config.log.filter.as_str()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LIGATURE_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter '{level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
