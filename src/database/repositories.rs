use crate::database::DbPool;
use crate::models::{Column, ColumnType, Table, Value};
use anyhow::{Context, Result};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};

/// Postgres rejects statements with more bind parameters than this.
const MAX_BIND_PARAMETERS: usize = 65_535;

/// Destination tables that are dropped and recreated on every load
pub mod destination_table {
    use super::*;

    /// Replace `table_name` with the contents of `table`.
    ///
    /// Drop, create and insert run in one transaction, so a failure leaves the
    /// previous table in place. Returns the number of rows inserted.
    pub async fn replace(pool: &DbPool, table_name: &str, table: &Table) -> Result<u64> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(&drop_statement(table_name))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to drop table {}", table_name))?;

        sqlx::query(&create_statement(table_name, table.columns()))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to create table {}", table_name))?;

        let mut inserted = 0;
        if !table.columns().is_empty() {
            for batch in table.rows().chunks(rows_per_statement(table.column_count())) {
                let mut query_builder = QueryBuilder::<Postgres>::new(insert_prefix(table_name, table.columns()));

                query_builder.push_values(batch, |mut b, row| {
                    for (value, column) in row.iter().zip(table.columns()) {
                        push_typed_bind(&mut b, value, column.column_type);
                    }
                });

                let result = query_builder
                    .build()
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to insert rows into {}", table_name))?;
                inserted += result.rows_affected();
            }
        }

        tx.commit().await.context("Failed to commit table replacement")?;

        Ok(inserted)
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn drop_statement(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table_name))
}

fn create_statement(table_name: &str, columns: &[Column]) -> String {
    let definitions = columns
        .iter()
        .map(|column| format!("{} {}", quote_identifier(&column.name), column.column_type.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");

    format!("CREATE TABLE {} ({})", quote_identifier(table_name), definitions)
}

fn insert_prefix(table_name: &str, columns: &[Column]) -> String {
    let names = columns
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) ", quote_identifier(table_name), names)
}

fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMETERS / column_count.max(1)).max(1)
}

/// Bind with the column's SQL type so nulls are typed correctly.
fn push_typed_bind(separated: &mut Separated<'_, '_, Postgres, &'static str>, value: &Value, column_type: ColumnType) {
    match column_type {
        ColumnType::Integer => separated.push_bind(value.as_integer()),
        ColumnType::Float => separated.push_bind(value.as_float()),
        ColumnType::Boolean => separated.push_bind(value.as_boolean()),
        ColumnType::Text => separated.push_bind(value.as_text()),
        ColumnType::Timestamp => separated.push_bind(value.as_timestamp()),
    };
}
