use crate::error::{error_chain, FatalError};
use crate::models::FolderEntry;
use crate::services::notification::Notification;
use std::time::{Duration, Instant};

pub const SUCCESS_SUBJECT: &str = "Conversion Process Completed";
pub const FAILURE_SUBJECT: &str = "Conversion Process Error";

/// Lifecycle of one run. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Timing and volume of one folder that reached its destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTiming {
    pub folder: String,
    pub table_name: String,
    pub rows: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Data rows parsed from files, including folders whose load later failed.
    pub rows_read: usize,
    /// Rows written to destination tables.
    pub rows_processed: usize,
    pub folders: Vec<FolderTiming>,
    pub last_folder_elapsed: Duration,
    pub total_elapsed: Duration,
}

/// Final state of a run together with its notification
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    pub counters: RunCounters,
    pub notification: Notification,
}

/// Tracks counters across the run. `complete` and `fail` consume the reporter,
/// so a run renders exactly one closing notification.
#[derive(Debug)]
pub struct RunReporter {
    state: RunState,
    started: Option<Instant>,
    counters: RunCounters,
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReporter {
    pub fn new() -> Self {
        Self {
            state: RunState::NotStarted,
            started: None,
            counters: RunCounters::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn start(&mut self) {
        if self.state == RunState::NotStarted {
            self.state = RunState::Running;
            self.started = Some(Instant::now());
        }
    }

    pub fn record_rows_read(&mut self, rows: usize) {
        self.counters.rows_read += rows;
    }

    pub fn record_folder_loaded(&mut self, entry: &FolderEntry, rows: usize, elapsed: Duration) {
        self.counters.rows_processed += rows;
        self.counters.last_folder_elapsed = elapsed;
        self.counters.folders.push(FolderTiming {
            folder: entry.folder.display().to_string(),
            table_name: entry.table_name.clone(),
            rows,
            elapsed,
        });
    }

    /// Move to `Completed` and render the success notification.
    pub fn complete(mut self) -> RunReport {
        self.finish();
        let notification = Notification {
            subject: SUCCESS_SUBJECT.to_string(),
            body: format!(
                "The conversion process has completed successfully.\n\
                 Total number of rows read from files: {}\n\
                 Total number of rows processed: {}\n\
                 Time taken by the last folder: {}\n\
                 Total time taken: {}\n\
                 {}\
                 {}\n",
                self.counters.rows_read,
                self.counters.rows_processed,
                format_duration(self.counters.last_folder_elapsed),
                format_duration(self.counters.total_elapsed),
                self.folder_breakdown(),
                footer(),
            ),
        };
        self.into_report(RunState::Completed, notification)
    }

    /// Move to `Failed` and render the failure notification.
    pub fn fail(mut self, error: &FatalError) -> RunReport {
        self.finish();
        let notification = Notification {
            subject: FAILURE_SUBJECT.to_string(),
            body: format!(
                "An error occurred during the conversion process: {}\n\
                 Details:\n\
                 Total number of rows read from files before error occurred: {}\n\
                 Total number of rows processed before error occurred: {}\n\
                 Time taken by the last completed folder: {}\n\
                 Total time taken before error occurred: {}\n\
                 {}\
                 {}\n",
                error_chain(error),
                self.counters.rows_read,
                self.counters.rows_processed,
                format_duration(self.counters.last_folder_elapsed),
                format_duration(self.counters.total_elapsed),
                self.folder_breakdown(),
                footer(),
            ),
        };
        self.into_report(RunState::Failed, notification)
    }

    fn finish(&mut self) {
        self.counters.total_elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
    }

    fn into_report(self, state: RunState, notification: Notification) -> RunReport {
        RunReport {
            state,
            counters: self.counters,
            notification,
        }
    }

    fn folder_breakdown(&self) -> String {
        if self.counters.folders.is_empty() {
            return String::new();
        }

        let mut breakdown = String::from("Folders loaded:\n");
        for timing in &self.counters.folders {
            breakdown.push_str(&format!(
                "  {} -> {}: {} rows in {}\n",
                timing.folder,
                timing.table_name,
                timing.rows,
                format_duration(timing.elapsed)
            ));
        }
        breakdown
    }
}

fn footer() -> String {
    format!(
        "This email was automatically generated using the folder table loader version {}.",
        env!("CARGO_PKG_VERSION")
    )
}

/// Render as seconds with millisecond precision, e.g. `1.250s`
pub fn format_duration(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(table: &str) -> FolderEntry {
        FolderEntry {
            folder: PathBuf::from(format!("/data/{}", table.to_lowercase())),
            table_name: table.to_string(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.250s");
        assert_eq!(format_duration(Duration::ZERO), "0.000s");
    }

    #[test]
    fn test_complete_reports_counters_and_breakdown() {
        let mut reporter = RunReporter::new();
        reporter.start();
        assert_eq!(reporter.state(), RunState::Running);

        reporter.record_rows_read(3);
        reporter.record_folder_loaded(&entry("Invoices"), 3, Duration::from_millis(400));
        reporter.record_rows_read(5);
        reporter.record_folder_loaded(&entry("Customers"), 5, Duration::from_millis(100));

        let report = reporter.complete();
        let notification = &report.notification;
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.counters.rows_processed, 8);
        assert_eq!(notification.subject, SUCCESS_SUBJECT);
        assert!(notification.body.contains("Total number of rows read from files: 8\n"));
        assert!(notification.body.contains("Total number of rows processed: 8\n"));
        assert!(notification.body.contains("Time taken by the last folder: 0.100s\n"));
        assert!(notification.body.contains("/data/invoices -> Invoices: 3 rows in 0.400s"));
        assert!(notification.body.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_fail_reports_error_and_partial_counters() {
        let mut reporter = RunReporter::new();
        reporter.start();
        reporter.record_rows_read(3);
        reporter.record_folder_loaded(&entry("Invoices"), 3, Duration::from_millis(10));
        reporter.record_rows_read(2);

        let error = FatalError::Load {
            table: "Customers".to_string(),
            source: anyhow::anyhow!("permission denied for table Customers"),
        };
        let report = reporter.fail(&error);
        let notification = &report.notification;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(notification.subject, FAILURE_SUBJECT);
        assert!(notification.body.contains("permission denied for table Customers"));
        assert!(notification.body.contains("rows read from files before error occurred: 5\n"));
        assert!(notification.body.contains("rows processed before error occurred: 3\n"));
    }

    #[test]
    fn test_failure_before_start_reports_zero_counters() {
        let reporter = RunReporter::new();
        assert_eq!(reporter.state(), RunState::NotStarted);

        let error = FatalError::Worker {
            folder: PathBuf::from("/data"),
            reason: "panicked".to_string(),
        };
        let report = reporter.fail(&error);
        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.counters.total_elapsed, Duration::ZERO);
        assert!(report.notification.body.contains("rows processed before error occurred: 0\n"));
        assert!(!report.notification.body.contains("Folders loaded:"));
    }
}
