use crate::database::{create_connection_pool, destination_table, DbPool};
use crate::models::{DatabaseSettings, Table};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Destination that receives each folder's combined table
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Replace `table_name` with exactly the rows of `table`. Returns rows written.
    async fn replace_table(&self, table_name: &str, table: &Table) -> Result<u64>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Opens the run's [`TableSink`]
#[async_trait]
pub trait SinkConnector: Send + Sync {
    async fn connect(&self, settings: &DatabaseSettings) -> Result<Box<dyn TableSink>>;
}

/// Postgres-backed sink over a single-connection pool
pub struct PostgresTableSink {
    pool: DbPool,
}

impl PostgresTableSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TableSink for PostgresTableSink {
    async fn replace_table(&self, table_name: &str, table: &Table) -> Result<u64> {
        let inserted = destination_table::replace(&self.pool, table_name, table).await?;
        info!(
            "Replaced table {} with {} rows across {} columns",
            table_name,
            inserted,
            table.column_count()
        );
        Ok(inserted)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl SinkConnector for PostgresConnector {
    async fn connect(&self, settings: &DatabaseSettings) -> Result<Box<dyn TableSink>> {
        let pool = create_connection_pool(settings).await?;
        info!("Database connection established");
        Ok(Box::new(PostgresTableSink::new(pool)))
    }
}
