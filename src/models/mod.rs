pub mod configuration;
pub mod row_batch;
pub mod table;

pub use configuration::{
    load_configuration, parse_configuration, Configuration, DatabaseSettings, FolderEntry,
    MailSettings,
};
pub use row_batch::{read_row_batch, RowBatch, CONVERSION_TIME_COLUMN, FILE_NAME_COLUMN};
pub use table::{infer_column, is_missing, Column, ColumnType, ConstantColumn, Table, TableBuilder, Value, MISSING_VALUES};
