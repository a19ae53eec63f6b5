use crate::error::{error_chain, FatalError};
use crate::models::Configuration;
use crate::services::folder_aggregation::{aggregate_folder, DEFAULT_EXTENSION};
use crate::services::notification::{Notification, Notifier};
use crate::services::run_report::{RunCounters, RunReporter, RunState};
use crate::services::table_load::{SinkConnector, TableSink};
use std::time::Instant;
use tracing::{error, info};

/// Options that come from the command line rather than the configuration file
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub extension: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// How a run ended and what was sent about it
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: RunState,
    pub counters: RunCounters,
    pub error: Option<String>,
    pub notification: Notification,
    pub notification_delivered: bool,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Run every configured folder through aggregation and load, then notify.
///
/// Any fatal error stops the remaining folders; folders already loaded stay
/// replaced. Exactly one notification is attempted per run.
pub async fn run_conversion(
    config: &Configuration,
    options: &RunOptions,
    connector: &dyn SinkConnector,
    notifier: &dyn Notifier,
) -> RunOutcome {
    let mut reporter = RunReporter::new();
    reporter.start();

    let result = convert_folders(config, options, connector, &mut reporter).await;

    let (report, error) = match result {
        Ok(()) => {
            info!("Total rows processed: {}", reporter.counters().rows_processed);
            info!("All conversions completed successfully");
            (reporter.complete(), None)
        }
        Err(e) => {
            let report = reporter.fail(&e);
            let detail = error_chain(&e);
            // anyhow's Debug renders the cause list, plus a backtrace when RUST_BACKTRACE is set
            error!("An error occurred: {:?}", anyhow::Error::new(e));
            (report, Some(detail))
        }
    };

    let notification_delivered = match notifier.send(&report.notification).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to send '{}' notification: {:#}", report.notification.subject, e);
            false
        }
    };

    RunOutcome {
        state: report.state,
        counters: report.counters,
        error,
        notification: report.notification,
        notification_delivered,
    }
}

async fn convert_folders(
    config: &Configuration,
    options: &RunOptions,
    connector: &dyn SinkConnector,
    reporter: &mut RunReporter,
) -> Result<(), FatalError> {
    let sink = connector
        .connect(&config.database)
        .await
        .map_err(|source| FatalError::Connect {
            host: config.database.host.clone(),
            database: config.database.database.clone(),
            source,
        })?;

    let result = load_folders(config, options, sink.as_ref(), reporter).await;
    sink.close().await;
    result
}

async fn load_folders(
    config: &Configuration,
    options: &RunOptions,
    sink: &dyn TableSink,
    reporter: &mut RunReporter,
) -> Result<(), FatalError> {
    for entry in &config.folders {
        let started = Instant::now();

        let worker_entry = entry.clone();
        let extension = options.extension.clone();
        let aggregate = tokio::task::spawn_blocking(move || aggregate_folder(&worker_entry, &extension))
            .await
            .map_err(|e| FatalError::Worker {
                folder: entry.folder.clone(),
                reason: e.to_string(),
            })??;

        reporter.record_rows_read(aggregate.rows());

        sink.replace_table(&entry.table_name, &aggregate.table)
            .await
            .map_err(|source| FatalError::Load {
                table: entry.table_name.clone(),
                source,
            })?;

        let elapsed = started.elapsed();
        reporter.record_folder_loaded(entry, aggregate.table.row_count(), elapsed);

        info!(
            "Successfully converted data from {} to table {}. Files: {} processed, {} skipped. Total time taken: {:?}",
            entry.folder.display(),
            entry.table_name,
            aggregate.processed.len(),
            aggregate.skipped.len(),
            elapsed
        );
    }

    Ok(())
}
