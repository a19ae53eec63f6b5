use crate::models::DatabaseSettings;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};

/// Opens the run's single database connection
pub async fn create_connection_pool(settings: &DatabaseSettings) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect(&connection_url(settings))
        .await
        .with_context(|| {
            format!(
                "Failed to connect to PostgreSQL database {} on {}",
                settings.database, settings.host
            )
        })
}

/// Build the connection URL, percent-encoding the credentials
pub fn connection_url(settings: &DatabaseSettings) -> String {
    format!(
        "postgres://{}:{}@{}/{}",
        urlencoding::encode(&settings.username),
        urlencoding::encode(&settings.password),
        settings.host,
        urlencoding::encode(&settings.database),
    )
}

/// Type alias for our database pool
pub type DbPool = Pool<Postgres>;
