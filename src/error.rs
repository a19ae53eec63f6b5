use std::path::PathBuf;
use thiserror::Error;

/// Problems with the configuration file. Always fatal, and raised before
/// any folder is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {} is not valid JSON", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration file {} has an unexpected shape", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("required configuration key '{0}' is missing")]
    MissingKey(&'static str),

    #[error("configuration key '{key}' is invalid: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// A single delimited file could not be turned into a row batch.
///
/// Recoverable: the file is logged and skipped, its siblings are unaffected.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no header row", .path.display())]
    Empty { path: PathBuf },

    #[error("{} line {line}: expected {expected} fields, saw {found}", .path.display())]
    RaggedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Run-level failure. Aborts the remaining folders and produces the failure
/// notification.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to database '{database}' on '{host}'")]
    Connect {
        host: String,
        database: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to list folder {}", .folder.display())]
    ListFolder {
        folder: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("folder worker for {} stopped unexpectedly: {reason}", .folder.display())]
    Worker { folder: PathBuf, reason: String },

    #[error("failed to replace table '{table}'")]
    Load {
        table: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Render an error followed by every cause in its source chain.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_includes_sources() {
        let error = FatalError::Load {
            table: "Invoices".to_string(),
            source: anyhow::anyhow!("permission denied for schema public"),
        };
        assert_eq!(
            error_chain(&error),
            "failed to replace table 'Invoices': permission denied for schema public"
        );
    }

    #[test]
    fn test_error_chain_without_source() {
        let error = ConfigError::MissingKey("smtp_server");
        assert_eq!(
            error_chain(&error),
            "required configuration key 'smtp_server' is missing"
        );
    }
}
