use anyhow::{Context, Result};
use chrono::Local;
use clap::{Arg, Command};
use folder_table_loader::services::DEFAULT_EXTENSION;
use folder_table_loader::utils::open_log_file;
use folder_table_loader::{
    load_configuration, run_conversion, Configuration, PostgresConnector, RunOptions, RunOutcome,
    SmtpNotifier,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Settings taken from the command line
#[derive(Debug, Clone)]
struct CliOptions {
    config_path: PathBuf,
    log_level: String,
    run: RunOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("Folder Table Loader")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads pipe-delimited files from configured folders into database tables")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to the JSON configuration file")
                .default_value("config.json"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Set the log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("extension")
                .long("extension")
                .value_name("SUFFIX")
                .help("File name suffix of the delimited files to load (case-sensitive)")
                .default_value(DEFAULT_EXTENSION),
        )
        .get_matches();

    let options = create_cli_options(&matches)?;

    load_environment_variables();

    // Nothing can be logged or mailed without a valid configuration
    let config = load_configuration(&options.config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", options.config_path))?;

    let log_path = initialize_logging(&config.log_folder, &options.log_level)?;
    info!("Logging to {}", log_path.display());

    let outcome = run_application(&config, &options.run).await;
    print_run_summary(&outcome);

    Ok(())
}

fn create_cli_options(matches: &clap::ArgMatches) -> Result<CliOptions> {
    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .context("Missing --config value")?;

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .context("Missing --log-level value")?;

    let extension = matches
        .get_one::<String>("extension")
        .cloned()
        .context("Missing --extension value")?;

    if extension.is_empty() {
        anyhow::bail!("--extension must not be empty");
    }

    Ok(CliOptions {
        config_path,
        log_level,
        run: RunOptions { extension },
    })
}

/// Initialize structured logging to the run's log file and stdout
fn initialize_logging(log_folder: &Path, log_level: &str) -> Result<PathBuf> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("sqlx=warn".parse()?);

    let (log_path, log_file) = open_log_file(log_folder, Local::now())?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(log_path)
}

/// Load a .env file so RUST_LOG can be set per deployment
fn load_environment_variables() {
    if dotenvy::dotenv().is_err() {
        // Logging is not up yet
        eprintln!("No .env file found, using system environment variables");
    }
}

async fn run_application(config: &Configuration, options: &RunOptions) -> RunOutcome {
    info!("Starting folder table loader");
    info!(
        "Loading {} folders into database {} on {}",
        config.folders.len(),
        config.database.database,
        config.database.host
    );

    let notifier = SmtpNotifier::new(config.mail.clone());
    run_conversion(config, options, &PostgresConnector, &notifier).await
}

fn print_run_summary(outcome: &RunOutcome) {
    info!("=== RUN SUMMARY ===");
    info!("Outcome: {:?}", outcome.state);
    info!("Rows read: {}", outcome.counters.rows_read);
    info!("Rows processed: {}", outcome.counters.rows_processed);
    info!("Folders loaded: {}", outcome.counters.folders.len());

    if !outcome.notification_delivered {
        warn!("The '{}' notification was not delivered", outcome.notification.subject);
    }
}
