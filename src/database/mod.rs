pub mod connection;
pub mod repositories;

pub use connection::{connection_url, create_connection_pool, DbPool};
pub use repositories::{destination_table, quote_identifier};
