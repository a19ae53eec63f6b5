use crate::error::{error_chain, FatalError, FileError};
use crate::models::{read_row_batch, FolderEntry, Table, TableBuilder};
use crate::utils::list_files_with_extension;
use chrono::Local;
use tracing::{error, info, warn};

/// Default extension of the delimited files picked up in each folder
pub const DEFAULT_EXTENSION: &str = ".csv";

/// A file that was parsed and folded into the combined table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub file_name: String,
    pub rows: usize,
}

/// A file that was skipped because it could not be parsed
#[derive(Debug)]
pub struct SkippedFile {
    pub file_name: String,
    pub error: FileError,
}

/// Combined rows of one folder plus what happened to each file
#[derive(Debug)]
pub struct FolderAggregate {
    pub entry: FolderEntry,
    pub table: Table,
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl FolderAggregate {
    /// Rows contributed by successfully parsed files
    pub fn rows(&self) -> usize {
        self.processed.iter().map(|file| file.rows).sum()
    }

    pub fn files_seen(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }
}

/// Parse every matching file in the folder and concatenate their rows.
///
/// Column types are inferred once over the combined rows. A file that fails
/// to parse is logged and skipped. Failing to list the folder itself is fatal.
pub fn aggregate_folder(entry: &FolderEntry, extension: &str) -> Result<FolderAggregate, FatalError> {
    let files = list_files_with_extension(&entry.folder, extension).map_err(|source| {
        FatalError::ListFolder {
            folder: entry.folder.clone(),
            source,
        }
    })?;

    if files.is_empty() {
        warn!("No {} files found in folder {}", extension, entry.folder.display());
    }

    let mut builder = TableBuilder::new();
    let mut processed = Vec::new();
    let mut skipped = Vec::new();

    for file_path in files {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match read_row_batch(&file_path, Local::now().naive_local()) {
            Ok(batch) => {
                let rows = batch.row_count();
                batch.append_to(&mut builder);
                info!(
                    "Processed {} rows from {} in folder {}",
                    rows,
                    file_name,
                    entry.folder.display()
                );
                processed.push(ProcessedFile { file_name, rows });
            }
            Err(e) => {
                error!(
                    "Error processing {} in folder {}: {}",
                    file_name,
                    entry.folder.display(),
                    error_chain(&e)
                );
                skipped.push(SkippedFile { file_name, error: e });
            }
        }
    }

    Ok(FolderAggregate {
        entry: entry.clone(),
        table: builder.finish(),
        processed,
        skipped,
    })
}
