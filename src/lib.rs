pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use database::{create_connection_pool, DbPool};
pub use error::{ConfigError, FatalError, FileError};
pub use models::{load_configuration, Configuration, FolderEntry, Table, TableBuilder, Value};
pub use services::{
    run_conversion, Notification, Notifier, PostgresConnector, RunOptions, RunOutcome, RunState,
    SinkConnector, SmtpNotifier, TableSink,
};
