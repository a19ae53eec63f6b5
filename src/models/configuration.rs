use crate::error::ConfigError;
use lettre::Address;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Every key the configuration file must define.
pub const REQUIRED_KEYS: [&str; 9] = [
    "log_folder",
    "folder_table_mapping",
    "server_name",
    "database_name",
    "sql_username",
    "sql_password",
    "smtp_server",
    "sender_email",
    "recipient_emails",
];

/// A source folder and the table its combined rows replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub folder: PathBuf,
    pub table_name: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub smtp_server: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

/// Immutable run configuration. Folders are kept in the order the file lists them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub log_folder: PathBuf,
    pub folders: Vec<FolderEntry>,
    pub database: DatabaseSettings,
    pub mail: MailSettings,
}

/// Configuration file as written, before any validation. Absent or null keys
/// deserialize to `None` so they can be reported by name.
#[derive(Debug, Deserialize)]
struct RawConfiguration {
    log_folder: Option<String>,
    folder_table_mapping: Option<Map<String, Value>>,
    server_name: Option<String>,
    database_name: Option<String>,
    sql_username: Option<String>,
    sql_password: Option<String>,
    smtp_server: Option<String>,
    sender_email: Option<String>,
    recipient_emails: Option<Vec<String>>,
}

/// Read and validate the JSON configuration file at `path`.
pub fn load_configuration<P: AsRef<Path>>(path: P) -> Result<Configuration, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_configuration(path, &contents)
}

/// Parse and validate configuration text read from `path`.
pub fn parse_configuration(path: &Path, contents: &str) -> Result<Configuration, ConfigError> {
    let raw: RawConfiguration = serde_json::from_str(contents).map_err(|source| {
        if source.is_data() {
            ConfigError::Schema {
                path: path.to_path_buf(),
                source,
            }
        } else {
            ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let log_folder = required(raw.log_folder, "log_folder")?;
    let mapping = required(raw.folder_table_mapping, "folder_table_mapping")?;
    let host = required(raw.server_name, "server_name")?;
    let database = required(raw.database_name, "database_name")?;
    let username = required(raw.sql_username, "sql_username")?;
    // An empty password is valid for trust or peer authentication
    let password = required(raw.sql_password, "sql_password")?;
    let smtp_server = required(raw.smtp_server, "smtp_server")?;
    let sender = required(raw.sender_email, "sender_email")?;
    let recipients = required(raw.recipient_emails, "recipient_emails")?;

    let configuration = Configuration {
        log_folder: PathBuf::from(non_empty(log_folder, "log_folder")?),
        folders: folder_entries(mapping)?,
        database: DatabaseSettings {
            host: non_empty(host, "server_name")?,
            database: non_empty(database, "database_name")?,
            username: non_empty(username, "sql_username")?,
            password,
        },
        mail: MailSettings {
            smtp_server: non_empty(smtp_server, "smtp_server")?,
            sender: email_address(sender, "sender_email")?,
            recipients: recipient_addresses(recipients)?,
        },
    };

    Ok(configuration)
}

fn required<T>(value: Option<T>, key: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingKey(key))
}

fn non_empty(value: String, key: &'static str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

fn email_address(value: String, key: &'static str) -> Result<String, ConfigError> {
    let value = non_empty(value, key)?;
    validate_address(key, &value)?;
    Ok(value)
}

fn validate_address(key: &'static str, value: &str) -> Result<(), ConfigError> {
    value
        .parse::<Address>()
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue {
            key,
            reason: format!("'{}' is not an email address: {}", value, e),
        })
}

fn recipient_addresses(list: Vec<String>) -> Result<Vec<String>, ConfigError> {
    const KEY: &str = "recipient_emails";

    if list.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: KEY,
            reason: "at least one recipient is required".to_string(),
        });
    }

    for address in &list {
        validate_address(KEY, address)?;
    }
    Ok(list)
}

/// Folder entries in the order the file lists them.
fn folder_entries(mapping: Map<String, Value>) -> Result<Vec<FolderEntry>, ConfigError> {
    const KEY: &str = "folder_table_mapping";

    mapping
        .into_iter()
        .map(|(folder, table)| match table {
            Value::String(table_name) if !table_name.trim().is_empty() => Ok(FolderEntry {
                folder: PathBuf::from(folder),
                table_name,
            }),
            _ => Err(ConfigError::InvalidValue {
                key: KEY,
                reason: format!("table name for folder '{}' must be a non-empty string", folder),
            }),
        })
        .collect()
}
