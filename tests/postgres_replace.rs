use std::env;
use std::fs;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use folder_table_loader::database::destination_table;
use folder_table_loader::models::read_row_batch;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;

const TABLE_NAME: &str = "folder_loader_replace_test";

#[tokio::test]
async fn replace_recreates_table_from_delimited_file() -> Result<()> {
    let database_url = match env::var("FOLDER_LOADER_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping Postgres replace test because FOLDER_LOADER_TEST_DATABASE_URL is not set");
            return Ok(());
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("connect to test database")?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("parts.csv");
    fs::write(&path, "id|code|price|active|\n1|007|1.5|true|\n2|X7||False|\n3|1e3|2|TRUE|\n")?;

    let converted_at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|date| date.and_hms_opt(6, 30, 0))
        .context("valid timestamp")?;
    let table = read_row_batch(&path, converted_at)?.into_table();

    let first = destination_table::replace(&pool, TABLE_NAME, &table).await?;
    let second = destination_table::replace(&pool, TABLE_NAME, &table).await?;
    assert_eq!(first, 3);
    assert_eq!(second, 3);

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", TABLE_NAME))
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 3);

    let rows = sqlx::query(&format!(
        "SELECT id, code, price, active, \"Unnamed: 4\", \"FileName\", \"ConversionTime\" FROM \"{}\" ORDER BY id",
        TABLE_NAME
    ))
    .fetch_all(&pool)
    .await?;

    let codes: Vec<String> = rows.iter().map(|row| row.get::<String, _>("code")).collect();
    assert_eq!(codes, vec!["007", "X7", "1e3"]);

    let prices: Vec<Option<f64>> = rows.iter().map(|row| row.get("price")).collect();
    assert_eq!(prices, vec![Some(1.5), None, Some(2.0)]);

    let active: Vec<bool> = rows.iter().map(|row| row.get("active")).collect();
    assert_eq!(active, vec![true, false, true]);

    let unnamed: Option<String> = rows[0].get("Unnamed: 4");
    assert!(unnamed.is_none());

    let file_name: String = rows[0].get("FileName");
    assert_eq!(file_name, "parts.csv");
    let stamp: chrono::NaiveDateTime = rows[0].get("ConversionTime");
    assert_eq!(stamp, converted_at);

    sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", TABLE_NAME))
        .execute(&pool)
        .await?;
    pool.close().await;

    Ok(())
}
