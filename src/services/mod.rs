pub mod conversion_run;
pub mod folder_aggregation;
pub mod notification;
pub mod run_report;
pub mod table_load;

pub use conversion_run::{run_conversion, RunOptions, RunOutcome};
pub use folder_aggregation::{
    aggregate_folder, FolderAggregate, ProcessedFile, SkippedFile, DEFAULT_EXTENSION,
};
pub use notification::{build_message, Notification, Notifier, SmtpNotifier};
pub use run_report::{
    format_duration, FolderTiming, RunCounters, RunReport, RunReporter, RunState,
    FAILURE_SUBJECT, SUCCESS_SUBJECT,
};
pub use table_load::{PostgresConnector, PostgresTableSink, SinkConnector, TableSink};
