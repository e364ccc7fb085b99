//! Server connection settings and retrieval tuning.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::SourceError;
use crate::quoting::QuoteStyle;

/// Database engines reachable through the `sqlx` Any driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Postgres,
    MySql,
    Sqlite,
}

impl Driver {
    /// Port used when none is configured. SQLite has none.
    pub fn default_port(&self) -> u16 {
        match self {
            Driver::Postgres => 5432,
            Driver::MySql => 3306,
            Driver::Sqlite => 0,
        }
    }

    /// Identifier delimiters accepted by this engine.
    pub fn quote_style(&self) -> QuoteStyle {
        match self {
            Driver::Postgres => QuoteStyle::DoubleQuotes,
            Driver::MySql => QuoteStyle::Backticks,
            Driver::Sqlite => QuoteStyle::Brackets,
        }
    }

    fn is_network(&self) -> bool {
        !matches!(self, Driver::Sqlite)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Driver::Postgres => "postgres",
            Driver::MySql => "mysql",
            Driver::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

impl FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(format!("unsupported driver: {}", other)),
        }
    }
}

/// Where and how to connect.
///
/// For SQLite, `host` is the database file path and the credentials are
/// ignored.
#[derive(Clone)]
pub struct ServerConfig {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Catalog to select on every connection, if any.
    pub database: Option<String>,
    pub pool_size: u32,
    pub connect_timeout: Duration,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ServerConfig {
    pub fn new(
        driver: Driver,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: None,
            pool_size: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// A read-only SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Driver::Sqlite, path, 0, "", "")
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        if self.host.trim().is_empty() {
            return Err(SourceError::Config(match self.driver {
                Driver::Sqlite => "database file path must be set".into(),
                _ => "host must be set".into(),
            }));
        }
        if self.driver.is_network() && self.port == 0 {
            return Err(SourceError::Config(format!(
                "port must be set for {}",
                self.driver
            )));
        }
        if self.pool_size == 0 {
            return Err(SourceError::Config("pool size must be at least 1".into()));
        }
        if matches!(&self.database, Some(db) if db.trim().is_empty()) {
            return Err(SourceError::Config("database name must not be empty".into()));
        }
        Ok(())
    }

    /// Driver URL for this server. Credentials are percent-encoded.
    ///
    /// Postgres cannot switch catalogs on an open connection, so its database
    /// goes into the URL path. MySQL selects it per connection instead.
    pub fn connection_url(&self) -> Result<String, SourceError> {
        if self.driver == Driver::Sqlite {
            return Ok(format!("sqlite://{}?mode=ro", self.host));
        }

        let mut url = Url::parse(&format!("{}://localhost", self.driver))
            .map_err(|e| SourceError::Config(e.to_string()))?;
        url.set_host(Some(&self.host))
            .map_err(|e| SourceError::Config(format!("invalid host '{}': {}", self.host, e)))?;
        url.set_port(Some(self.port))
            .map_err(|_| SourceError::Config(format!("invalid port {}", self.port)))?;
        if !self.user.is_empty() {
            url.set_username(&self.user)
                .map_err(|_| SourceError::Config("invalid user name".into()))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| SourceError::Config("invalid password".into()))?;
        }
        if let (Driver::Postgres, Some(database)) = (self.driver, &self.database) {
            url.path_segments_mut()
                .map_err(|_| SourceError::Config("invalid database name".into()))?
                .clear()
                .push(database);
        }
        Ok(url.to_string())
    }
}

/// Batching and waiting behaviour of a relational source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Rows per batch.
    pub max_batch_rows: usize,
    /// Ceiling on how long a consumer waits for one batch.
    pub wait_timeout: Duration,
    /// How often a waiting consumer re-checks and reports progress.
    pub poll_interval: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_batch_rows: 1000,
            wait_timeout: Duration::from_millis(60_000),
            poll_interval: Duration::from_millis(6_000),
        }
    }
}

impl RetrievalConfig {
    /// Defaults overridden by `RDFWEAVER_BATCH_ROWS`,
    /// `RDFWEAVER_WAIT_TIMEOUT_MS` and `RDFWEAVER_POLL_INTERVAL_MS`.
    pub fn from_env() -> Result<Self, SourceError> {
        let defaults = Self::default();
        let config = Self {
            max_batch_rows: env_or("RDFWEAVER_BATCH_ROWS", defaults.max_batch_rows)?,
            wait_timeout: env_millis_or("RDFWEAVER_WAIT_TIMEOUT_MS", defaults.wait_timeout)?,
            poll_interval: env_millis_or("RDFWEAVER_POLL_INTERVAL_MS", defaults.poll_interval)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_batch_rows(mut self, rows: usize) -> Self {
        self.max_batch_rows = rows;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        if self.max_batch_rows == 0 {
            return Err(SourceError::Config("batch size must be at least 1 row".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(SourceError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, SourceError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| SourceError::Config(format!("Invalid {}: '{}'", key, value))),
        Err(_) => Ok(default),
    }
}

fn env_millis_or(key: &str, default: Duration) -> Result<Duration, SourceError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    env_or(key, default_ms).map(Duration::from_millis)
}
