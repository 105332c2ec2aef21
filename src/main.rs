use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use gator::{Cli, Config, Database};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> gator::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = Config::load_or_default(&config_path)?;
    config.apply_env_overrides();
    config.validate()?;

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }
    debug!("Using configuration at {:?}", config_path);

    let db = Database::open(config.database_path(&config_path)).await?;
    let mut app = gator::App::new(config, config_path, db);

    let mut stdout = std::io::stdout().lock();
    gator::execute(&mut app, cli.command, &mut stdout).await
}
