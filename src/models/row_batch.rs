use crate::error::FileError;
use crate::models::table::{ColumnType, ConstantColumn, Table, TableBuilder, Value};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::path::Path;

/// Field delimiter of every source file.
pub const FIELD_DELIMITER: u8 = b'|';

/// Provenance column holding the source file name.
pub const FILE_NAME_COLUMN: &str = "FileName";

/// Provenance column holding the moment the file was parsed.
pub const CONVERSION_TIME_COLUMN: &str = "ConversionTime";

/// Raw contents of one delimited file. Fields stay text until the folder's
/// combined table is built, so column types are decided over every file at once.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub file_name: String,
    pub converted_at: NaiveDateTime,
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RowBatch {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// `FileName` and `ConversionTime` values for every row of this batch.
    pub fn provenance(&self) -> [ConstantColumn; 2] {
        [
            ConstantColumn {
                name: FILE_NAME_COLUMN,
                column_type: ColumnType::Text,
                value: Value::Text(self.file_name.clone()),
            },
            ConstantColumn {
                name: CONVERSION_TIME_COLUMN,
                column_type: ColumnType::Timestamp,
                value: Value::Timestamp(self.converted_at),
            },
        ]
    }

    pub fn append_to(self, builder: &mut TableBuilder) {
        let provenance = self.provenance();
        builder.push_rows(&self.headers, self.records, &provenance);
    }

    /// Typed table of this file alone, provenance columns included.
    pub fn into_table(self) -> Table {
        let mut builder = TableBuilder::new();
        self.append_to(&mut builder);
        builder.finish()
    }
}

/// Parse a pipe-delimited file whose first row is the header.
///
/// Rows shorter than the header are padded with nulls; rows longer than the
/// header reject the whole file.
pub fn read_row_batch<P: AsRef<Path>>(file_path: P, converted_at: NaiveDateTime) -> Result<RowBatch, FileError> {
    let path = file_path.as_ref();

    let mut reader = ReaderBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| FileError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let header_record = reader
        .headers()
        .map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let headers = header_names(path, &header_record)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if record.len() > headers.len() {
            return Err(FileError::RaggedRow {
                path: path.to_path_buf(),
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: headers.len(),
                found: record.len(),
            });
        }

        records.push(record.iter().map(str::to_string).collect());
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(RowBatch {
        file_name,
        converted_at,
        headers,
        records,
    })
}

/// Column names as pandas would read them: a blank name becomes
/// `Unnamed: <position>` and repeats get `.1`, `.2`, ... suffixes.
fn header_names(path: &Path, headers: &StringRecord) -> Result<Vec<String>, FileError> {
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(FileError::Empty {
            path: path.to_path_buf(),
        });
    }

    let named: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(position, name)| {
            if name.is_empty() {
                format!("Unnamed: {}", position)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(named.len());
    for name in &named {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}.{}", name, suffix);
            suffix += 1;
        }
        taken.insert(candidate.clone());
        names.push(candidate);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap()
    }

    fn column_names(table: &Table) -> Vec<&str> {
        table.columns().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_read_row_batch_appends_provenance_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "id|customer|amount\n1|ACME|10.5\n2|Globex|7\n3|Initech|\n").unwrap();

        let batch = read_row_batch(&path, timestamp()).unwrap();
        assert_eq!(batch.row_count(), 3);

        let table = batch.into_table();
        assert_eq!(
            column_names(&table),
            vec!["id", "customer", "amount", FILE_NAME_COLUMN, CONVERSION_TIME_COLUMN]
        );
        assert_eq!(table.columns()[0].column_type, ColumnType::Integer);
        assert_eq!(table.columns()[2].column_type, ColumnType::Float);
        assert!(table.rows()[2][2].is_null());

        let file_names = table.column_values(FILE_NAME_COLUMN).unwrap();
        assert!(file_names.iter().all(|v| **v == Value::Text("a.csv".to_string())));
        let times = table.column_values(CONVERSION_TIME_COLUMN).unwrap();
        assert!(times.iter().all(|v| **v == Value::Timestamp(timestamp())));
    }

    #[test]
    fn test_text_fields_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        fs::write(&path, "code|name\n007|Nan\nX7|Bob\n1e3|Infinity\n").unwrap();

        let table = read_row_batch(&path, timestamp()).unwrap().into_table();

        assert_eq!(table.columns()[0].column_type, ColumnType::Text);
        assert_eq!(table.columns()[1].column_type, ColumnType::Text);
        let text = |s: &str| Value::Text(s.to_string());
        assert_eq!(table.rows()[0][..2], [text("007"), text("Nan")]);
        assert_eq!(table.rows()[1][..2], [text("X7"), text("Bob")]);
        assert_eq!(table.rows()[2][..2], [text("1e3"), text("Infinity")]);
    }

    #[test]
    fn test_missing_value_markers_become_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("na.csv");
        fs::write(&path, "id|amount\n1|NA\n2|3.5\nNULL|n/a\n").unwrap();

        let table = read_row_batch(&path, timestamp()).unwrap().into_table();

        assert_eq!(table.columns()[0].column_type, ColumnType::Integer);
        assert_eq!(table.columns()[1].column_type, ColumnType::Float);
        assert!(table.rows()[0][1].is_null());
        assert!(table.rows()[2][0].is_null());
        assert_eq!(table.rows()[1][1], Value::Float(3.5));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, "id|name|region\n1|a\n").unwrap();

        let table = read_row_batch(&path, timestamp()).unwrap().into_table();
        assert_eq!(table.row_count(), 1);
        assert!(table.rows()[0][2].is_null());
    }

    #[test]
    fn test_long_row_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.csv");
        fs::write(&path, "id|name\n1|a\n2|b|unexpected\n").unwrap();

        match read_row_batch(&path, timestamp()) {
            Err(FileError::RaggedRow { line, expected, found, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("expected ragged row error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        assert!(matches!(read_row_batch(&path, timestamp()), Err(FileError::Empty { .. })));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.csv");
        fs::write(&path, "id|name\n").unwrap();

        let batch = read_row_batch(&path, timestamp()).unwrap();
        assert_eq!(batch.row_count(), 0);
        assert_eq!(batch.into_table().column_count(), 4);
    }

    #[test]
    fn test_trailing_delimiter_names_blank_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trailing.csv");
        fs::write(&path, "id|name|\n1|a|\n").unwrap();

        let table = read_row_batch(&path, timestamp()).unwrap().into_table();

        assert_eq!(
            column_names(&table),
            vec!["id", "name", "Unnamed: 2", FILE_NAME_COLUMN, CONVERSION_TIME_COLUMN]
        );
        assert!(table.rows()[0][2].is_null());
    }

    #[test]
    fn test_duplicate_headers_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        fs::write(&path, "id|id|name|id\n1|2|a|3\n").unwrap();

        let batch = read_row_batch(&path, timestamp()).unwrap();
        assert_eq!(batch.headers, vec!["id", "id.1", "name", "id.2"]);

        let table = batch.into_table();
        assert_eq!(table.rows()[0][..4], [Value::Integer(1), Value::Integer(2), Value::Text("a".to_string()), Value::Integer(3)]);
    }

    #[test]
    fn test_numbered_duplicate_skips_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        fs::write(&path, "id|id.1|id\n1|2|3\n").unwrap();

        let batch = read_row_batch(&path, timestamp()).unwrap();
        assert_eq!(batch.headers, vec!["id", "id.1", "id.2"]);
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_row_batch(dir.path().join("gone.csv"), timestamp()),
            Err(FileError::Open { .. })
        ));
    }
}
