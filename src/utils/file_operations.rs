use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// List regular files in `directory` whose name ends with `extension`.
///
/// Matching is case-sensitive. Results are sorted by file name so repeated
/// runs see the same order. A directory that cannot be read is an error.
pub fn list_files_with_extension<P: AsRef<Path>>(directory: P, extension: &str) -> Result<Vec<PathBuf>> {
    let dir_path = directory.as_ref();

    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read directory: {:?}", dir_path))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in directory: {:?}", dir_path))?;
        let path = entry.path();
        if path.is_file() && matches_extension(&path, extension) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Check if the file name ends with `extension`
fn matches_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(extension))
        .unwrap_or(false)
}

/// Log file for a run started at `started`: `conversion_YYYYmmdd_HHMMSS.log`.
pub fn log_file_path<P: AsRef<Path>>(log_folder: P, started: DateTime<Local>) -> PathBuf {
    log_folder
        .as_ref()
        .join(format!("conversion_{}.log", started.format("%Y%m%d_%H%M%S")))
}

/// Create the log folder if needed and open the run's log file for appending.
pub fn open_log_file<P: AsRef<Path>>(log_folder: P, started: DateTime<Local>) -> Result<(PathBuf, File)> {
    let folder = log_folder.as_ref();
    fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create log directory: {:?}", folder))?;

    let path = log_file_path(folder, started);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;

    Ok((path, file))
}
