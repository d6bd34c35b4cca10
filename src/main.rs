use clap::Parser;
use geostor::app::commands;
use geostor::config::cli::Cli;
use geostor::utils::error::{ErrorSeverity, GeostorError};
use geostor::utils::logger::{self, LogOptions};
use geostor::utils::validation::Validate;
use geostor::{GeostorConfig, Result};
use std::path::{Path, PathBuf};

/// Config file first, then command line overrides.
fn load_config(cli: &Cli) -> Result<GeostorConfig> {
    let (path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(geostor::config::DEFAULT_CONFIG_FILE), false),
    };
    let mut config = GeostorConfig::load_or_default(&path, explicit)?;

    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.display().to_string());
    }
    config.logging.json |= cli.json_logs;

    config.validate()?;
    Ok(config)
}

fn report(e: &GeostorError) {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let log_options = LogOptions {
        verbose: cli.verbose,
        json: config.logging.json,
        level: config.logging.level.as_deref(),
        file: config.logging.file.as_deref().map(Path::new),
    };
    if let Err(e) = logger::init_cli_logger(&log_options) {
        report(&e);
        std::process::exit(e.severity().exit_code().max(1));
    }

    tracing::info!("Starting geostor {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Configuration: {:?}", config);

    if let Err(e) = commands::execute(cli.command, &config).await {
        if e.severity() == ErrorSeverity::Low {
            tracing::warn!("⚠️ {}", e);
            eprintln!("⚠️ {}", e.user_friendly_message());
            return;
        }
        report(&e);
        std::process::exit(e.severity().exit_code());
    }
}
