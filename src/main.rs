use anyhow::Result;
use clap::{CommandFactory, Parser};

use artifact_forge::cli::{Cli, Command};
use artifact_forge::commands;
use artifact_forge::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        clap_complete::generate(
            args.shell,
            &mut Cli::command(),
            "artifact-forge",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    tracing::debug!(?config, "Loaded configuration");

    // Dispatch to subcommand
    match cli.command {
        Command::Build(args) => {
            tracing::info!(?args, "Starting build");
            commands::build::run(args, &config, cli.quiet)?;
        }
        Command::Languages(args) => commands::languages::run(args)?,
        Command::Detect(args) => commands::detect::run(args)?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn init_logging(verbosity: u8, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("artifact_forge={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
