pub mod file_operations;

pub use file_operations::{list_files_with_extension, log_file_path, open_log_file};
