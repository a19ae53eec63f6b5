use chrono::NaiveDateTime;

/// Field spellings read as null, the same set pandas treats as missing by default.
pub const MISSING_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(field: &str) -> bool {
    MISSING_VALUES.contains(&field)
}

/// Column type inferred from delimited text, or assigned to a provenance column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Timestamp,
}

impl ColumnType {
    /// Postgres type used when the destination table is recreated.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

fn parse_integer(field: &str) -> Option<Value> {
    field.parse::<i64>().ok().map(Value::Integer)
}

/// Decimal or exponent notation only; `inf`, `Infinity` and friends stay text.
fn parse_float(field: &str) -> Option<Value> {
    let unsigned = field.strip_prefix(&['+', '-'][..]).unwrap_or(field);
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    field.parse::<f64>().ok().map(Value::Float)
}

fn parse_boolean(field: &str) -> Option<Value> {
    match field {
        "True" | "TRUE" | "true" => Some(Value::Boolean(true)),
        "False" | "FALSE" | "false" => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn convert_all(fields: &[&str], parse: fn(&str) -> Option<Value>) -> Option<Vec<Value>> {
    fields
        .iter()
        .map(|field| if is_missing(field) { Some(Value::Null) } else { parse(field) })
        .collect()
}

/// Infer one type for a whole column of raw fields and convert every field to it.
///
/// Integer, float and boolean are tried in that order; a column that fits none
/// of them is text and keeps each field exactly as written.
pub fn infer_column(fields: &[&str]) -> (ColumnType, Vec<Value>) {
    let has_values = fields.iter().any(|field| !is_missing(field));

    if has_values {
        if let Some(values) = convert_all(fields, parse_integer) {
            return (ColumnType::Integer, values);
        }
        if let Some(values) = convert_all(fields, parse_float) {
            return (ColumnType::Float, values);
        }
        if let Some(values) = convert_all(fields, parse_boolean) {
            return (ColumnType::Boolean, values);
        }
    }

    let values = fields
        .iter()
        .map(|field| {
            if is_missing(field) {
                Value::Null
            } else {
                Value::Text(field.to_string())
            }
        })
        .collect();
    (ColumnType::Text, values)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// In-memory table of typed rows. Every row has exactly one value per column
/// and every non-null value matches its column's type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Values of the named column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

#[derive(Debug, Clone)]
enum Cell {
    Missing,
    Field(String),
    Typed(Value),
}

#[derive(Debug, Clone)]
struct PendingColumn {
    name: String,
    fixed: Option<ColumnType>,
}

/// Column assigned the same typed value on every row of a batch.
#[derive(Debug, Clone)]
pub struct ConstantColumn {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub value: Value,
}

/// Collects raw rows from several sources and types them once at the end.
///
/// The column set is the union of every batch's columns in first-seen order;
/// cells a batch does not provide are null. Types are inferred over the whole
/// column, so a text column keeps every field as written.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    columns: Vec<PendingColumn>,
    rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Append raw records laid out as `headers`, plus constant columns.
    ///
    /// A header sharing a constant column's name is ignored in favour of the constant.
    pub fn push_rows(&mut self, headers: &[String], records: Vec<Vec<String>>, constants: &[ConstantColumn]) {
        let field_positions: Vec<Option<usize>> = headers
            .iter()
            .map(|name| {
                if constants.iter().any(|constant| constant.name == name.as_str()) {
                    None
                } else {
                    Some(self.position_or_insert(name, None))
                }
            })
            .collect();

        let constant_positions: Vec<usize> = constants
            .iter()
            .map(|constant| self.position_or_insert(constant.name, Some(constant.column_type)))
            .collect();

        let width = self.columns.len();
        for record in records {
            let mut row = vec![Cell::Missing; width];
            for (field, position) in record.into_iter().zip(&field_positions) {
                if let Some(position) = position {
                    row[*position] = Cell::Field(field);
                }
            }
            for (constant, &position) in constants.iter().zip(&constant_positions) {
                row[position] = Cell::Typed(constant.value.clone());
            }
            self.rows.push(row);
        }
    }

    /// Infer column types and produce the typed table.
    pub fn finish(self) -> Table {
        let row_count = self.rows.len();
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut column_values = Vec::with_capacity(self.columns.len());

        for (index, pending) in self.columns.iter().enumerate() {
            let (column_type, values) = match pending.fixed {
                Some(column_type) => {
                    let values = self
                        .rows
                        .iter()
                        .map(|row| match &row[index] {
                            Cell::Typed(value) => value.clone(),
                            Cell::Missing | Cell::Field(_) => Value::Null,
                        })
                        .collect::<Vec<_>>();
                    (column_type, values)
                }
                None => {
                    let fields: Vec<&str> = self
                        .rows
                        .iter()
                        .map(|row| match &row[index] {
                            Cell::Field(field) => field.as_str(),
                            Cell::Missing | Cell::Typed(_) => "",
                        })
                        .collect();
                    infer_column(&fields)
                }
            };
            columns.push(Column::new(pending.name.clone(), column_type));
            column_values.push(values.into_iter());
        }

        let rows = (0..row_count)
            .map(|_| {
                column_values
                    .iter_mut()
                    .map(|values| values.next().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Table { columns, rows }
    }

    fn position_or_insert(&mut self, name: &str, fixed: Option<ColumnType>) -> usize {
        if let Some(position) = self.columns.iter().position(|column| column.name == name) {
            return position;
        }
        self.columns.push(PendingColumn {
            name: name.to_string(),
            fixed,
        });
        for row in &mut self.rows {
            row.push(Cell::Missing);
        }
        self.columns.len() - 1
    }
}
