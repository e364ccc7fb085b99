//! Connection provider.

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::info;

use crate::config::{Driver, ServerConfig};
use crate::error::SourceError;
use crate::quoting::QuoteStyle;

/// Open a connection pool for `config`.
pub async fn connect_pool(config: &ServerConfig) -> Result<AnyPool, SourceError> {
    config.validate()?;
    sqlx::any::install_default_drivers();

    let url = config.connection_url()?;
    let pool = AnyPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(config.connect_timeout)
        .connect(&url)
        .await
        .map_err(SourceError::connection)?;

    info!(
        "Connected to {} at {} (pool size {})",
        config.driver, config.host, config.pool_size
    );
    Ok(pool)
}

/// Statement that selects the configured catalog on a borrowed connection.
///
/// Only MySQL switches catalogs per connection; Postgres takes the database
/// from the URL and SQLite has none. Callers run it with `sqlx::raw_sql`,
/// since `USE` cannot be prepared.
pub fn catalog_statement(driver: Driver, database: Option<&str>) -> Option<String> {
    match (driver, database) {
        (Driver::MySql, Some(database)) if !database.trim().is_empty() => {
            Some(format!("USE {}", QuoteStyle::Backticks.quote(database)))
        }
        _ => None,
    }
}
