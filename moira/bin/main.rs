//! Entry point: parse arguments, load configuration, and run (or validate)
//! the notification engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use moira::controller::{self, Moira, SHUTDOWN_BROADCAST};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "moira", version, about = "Moira notification engine")]
struct Cli {
    /// Path to the RON or TOML configuration file.
    #[arg(short, long, default_value = "moira.ron")]
    config: PathBuf,

    /// Load and wire the configuration, then exit without serving.
    #[arg(long)]
    validate_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match moira::config::load(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("failed to load {}: {error}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    moira_common::logging::init(config.logging.level.as_deref());

    if cli.validate_config {
        return match controller::validate(&config).await {
            Ok(()) => {
                println!("{} is valid", cli.config.display());
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("{} is invalid: {error}", cli.config.display());
                ExitCode::FAILURE
            }
        };
    }

    tokio::spawn(async {
        if let Err(error) = controller::wait_for_shutdown().await {
            error!(%error, "shutdown coordinator failed");
        }
    });

    match Moira::new(config).run(SHUTDOWN_BROADCAST.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "moira exited with an error");
            ExitCode::FAILURE
        }
    }
}
