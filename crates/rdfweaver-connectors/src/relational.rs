//! Batched relational source.
//!
//! The first request for a source reference starts one background
//! [`RetrievalTask`]; every request (including that first one) then waits on
//! the reference's slot in the [`BatchStore`] for the batch it asked for.
//!
//! There is no way to cancel a running retrieval: a consumer that times out
//! leaves the task to run to completion, and its batches stay in the store
//! until [`RelationalSource::release`] is called.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rdfweaver_core::{Batch, InputSource, SourceRef};
use sqlx::{AnyPool, Executor};
use tracing::{debug, info};

use crate::batch_store::BatchStore;
use crate::config::{Driver, RetrievalConfig, ServerConfig};
use crate::error::SourceError;
use crate::pool::{catalog_statement, connect_pool};
use crate::query::QueryBuilder;
use crate::retrieval::RetrievalTask;

pub struct RelationalSource {
    pool: AnyPool,
    driver: Driver,
    database: Option<String>,
    queries: QueryBuilder,
    config: RetrievalConfig,
    store: BatchStore,
    started: AtomicUsize,
}

impl RelationalSource {
    /// Connect to `server` and build a source over the new pool.
    pub async fn connect(
        server: &ServerConfig,
        config: RetrievalConfig,
    ) -> Result<Self, SourceError> {
        config.validate()?;
        let pool = connect_pool(server).await?;
        Self::from_pool(pool, server.driver, server.database.clone(), config)
    }

    /// Build a source over an existing pool.
    pub fn from_pool(
        pool: AnyPool,
        driver: Driver,
        database: Option<String>,
        config: RetrievalConfig,
    ) -> Result<Self, SourceError> {
        config.validate()?;
        Ok(Self {
            pool,
            driver,
            database,
            queries: QueryBuilder::new(driver.quote_style()),
            config,
            store: BatchStore::new(),
            started: AtomicUsize::new(0),
        })
    }

    /// Number of retrieval tasks started over the lifetime of this source.
    pub fn started_retrievals(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of batches a full retrieval of `source` produces:
    /// `ceil(total_rows / max_batch_rows)`.
    ///
    /// Runs the count statement on its own connection and leaves retrieval
    /// state untouched.
    pub async fn calculate_num_of_batches(&self, source: &SourceRef) -> Result<usize, SourceError> {
        let sql = self.queries.prepare_count_query(source)?;
        let mut conn = self.pool.acquire().await.map_err(SourceError::connection)?;
        if let Some(catalog) = catalog_statement(self.driver, self.database.as_deref()) {
            (&mut *conn)
                .execute(sqlx::raw_sql(&catalog))
                .await
                .map_err(SourceError::catalog)?;
        }

        debug!("Count query: {}", sql);
        let total: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(SourceError::data_access)?;
        let total = usize::try_from(total)
            .map_err(|_| SourceError::DataAccess(format!("invalid row count {}", total)))?;

        let batches = total.div_ceil(self.config.max_batch_rows);
        info!("{} has {} rows in {} batches", source, total, batches);
        Ok(batches)
    }

    /// Batch `batch_id` of `source`, starting its retrieval on first use.
    pub async fn get_entity_record(
        &self,
        source: &SourceRef,
        batch_id: usize,
    ) -> Result<Arc<Batch>, SourceError> {
        let sql = self.queries.prepare_query(source)?;
        let (slot, claimed) = self.store.claim(source).await;
        if claimed {
            self.started.fetch_add(1, Ordering::SeqCst);
            RetrievalTask {
                pool: self.pool.clone(),
                driver: self.driver,
                database: self.database.clone(),
                source: source.clone(),
                sql,
                max_batch_rows: self.config.max_batch_rows,
                slot: Arc::clone(&slot),
            }
            .spawn();
        }

        slot.wait_for(batch_id, self.config.wait_timeout, self.config.poll_interval)
            .await
    }

    /// Discard the batches retrieved for `source`. A later request starts a
    /// fresh retrieval.
    pub async fn release(&self, source: &SourceRef) -> bool {
        self.store.release(source).await
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl InputSource for RelationalSource {
    type Error = SourceError;

    async fn calculate_num_of_batches(&self, source: &SourceRef) -> Result<usize, SourceError> {
        RelationalSource::calculate_num_of_batches(self, source).await
    }

    async fn get_entity_record(
        &self,
        source: &SourceRef,
        batch_id: usize,
    ) -> Result<Arc<Batch>, SourceError> {
        RelationalSource::get_entity_record(self, source, batch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::any::AnyPoolOptions;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn seed(rows: usize) -> (TempDir, String) {
        sqlx::any::install_default_drivers();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.db").to_string_lossy().into_owned();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite://{}?mode=rwc", path))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE Customers (id INTEGER PRIMARY KEY, name TEXT, email TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        if rows > 0 {
            sqlx::query(&format!(
                "INSERT INTO Customers (id, name) \
                 WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < {}) \
                 SELECT n, 'customer-' || n FROM seq",
                rows
            ))
            .execute(&pool)
            .await
            .unwrap();
        }
        pool.close().await;
        (dir, path)
    }

    async fn source_over(path: &str, config: RetrievalConfig) -> RelationalSource {
        RelationalSource::connect(&ServerConfig::sqlite(path), config)
            .await
            .unwrap()
    }

    fn fast_config(rows: usize) -> RetrievalConfig {
        RetrievalConfig::default()
            .with_max_batch_rows(rows)
            .with_wait_timeout(Duration::from_secs(30))
            .with_poll_interval(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_customers_in_three_batches() {
        let (_dir, path) = seed(2500).await;
        let source = source_over(&path, fast_config(1000)).await;
        let customers = SourceRef::table("main.Customers");

        assert_eq!(source.calculate_num_of_batches(&customers).await.unwrap(), 3);

        let sizes: Vec<usize> = {
            let mut sizes = Vec::new();
            for id in 0..3 {
                let batch = source.get_entity_record(&customers, id).await.unwrap();
                assert_eq!(batch.id(), id);
                sizes.push(batch.len());
            }
            sizes
        };
        assert_eq!(sizes, vec![1000, 1000, 500]);

        let err = source.get_entity_record(&customers, 3).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::BatchNotFound {
                batch_id: 3,
                produced: 3
            }
        );
        assert_eq!(source.started_retrievals(), 1);
    }

    #[tokio::test]
    async fn test_rows_keep_column_order_and_nulls() {
        let (_dir, path) = seed(3).await;
        let source = source_over(&path, fast_config(10)).await;

        let batch = source
            .get_entity_record(&SourceRef::query("SELECT id, name, email FROM Customers ORDER BY id"), 0)
            .await
            .unwrap();

        let first: Vec<(&str, Option<&str>)> = batch.rows()[0].columns().collect();
        assert_eq!(
            first,
            vec![("id", Some("1")), ("name", Some("customer-1")), ("email", None)]
        );
    }

    #[tokio::test]
    async fn test_no_row_lost_or_duplicated() {
        let (_dir, path) = seed(1234).await;
        let source = source_over(&path, fast_config(100)).await;
        let customers = SourceRef::table("Customers");

        let n = source.calculate_num_of_batches(&customers).await.unwrap();
        assert_eq!(n, 13);

        let mut ids = Vec::new();
        for batch_id in 0..n {
            let batch = source.get_entity_record(&customers, batch_id).await.unwrap();
            ids.extend(batch.iter().filter_map(|row| row.get("id").map(str::to_string)));
        }
        ids.sort_by_key(|id| id.parse::<usize>().unwrap());
        ids.dedup();
        assert_eq!(ids.len(), 1234);
    }

    #[tokio::test]
    async fn test_count_edge_cases() {
        let (_dir, path) = seed(0).await;
        let source = source_over(&path, fast_config(1000)).await;
        assert_eq!(
            source
                .calculate_num_of_batches(&SourceRef::table("Customers"))
                .await
                .unwrap(),
            0
        );

        let (_dir, path) = seed(1000).await;
        let source = source_over(&path, fast_config(1000)).await;
        assert_eq!(
            source
                .calculate_num_of_batches(&SourceRef::query("SELECT * FROM Customers;"))
                .await
                .unwrap(),
            1
        );
        assert_eq!(source.started_retrievals(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_has_no_batch_zero() {
        let (_dir, path) = seed(0).await;
        let source = source_over(&path, fast_config(1000)).await;

        let err = source
            .get_entity_record(&SourceRef::table("Customers"), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::BatchNotFound {
                batch_id: 0,
                produced: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_table_fails_fast() {
        let (_dir, path) = seed(10).await;
        let source = source_over(&path, fast_config(1000)).await;
        let missing = SourceRef::table("Missing");

        assert!(matches!(
            source.calculate_num_of_batches(&missing).await,
            Err(SourceError::DataAccess(_))
        ));

        let started = std::time::Instant::now();
        let err = source.get_entity_record(&missing, 0).await.unwrap_err();
        assert!(matches!(err, SourceError::DataAccess(_)));
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_invalid_reference_starts_nothing() {
        let (_dir, path) = seed(1).await;
        let source = source_over(&path, fast_config(1000)).await;

        let err = source
            .get_entity_record(&SourceRef::table("  "), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidReference(_)));
        assert_eq!(source.started_retrievals(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_share_one_retrieval() {
        let (_dir, path) = seed(500).await;
        let source = Arc::new(source_over(&path, fast_config(100)).await);
        let customers = SourceRef::table("Customers");

        let handles: Vec<_> = (0..5)
            .map(|batch_id| {
                let source = Arc::clone(&source);
                let customers = customers.clone();
                tokio::spawn(async move { source.get_entity_record(&customers, batch_id).await })
            })
            .collect();

        for (batch_id, handle) in handles.into_iter().enumerate() {
            let batch = handle.await.unwrap().unwrap();
            assert_eq!(batch.id(), batch_id);
            assert_eq!(batch.len(), 100);
        }
        assert_eq!(source.started_retrievals(), 1);
    }

    #[tokio::test]
    async fn test_release_allows_fresh_retrieval() {
        let (_dir, path) = seed(5).await;
        let source = source_over(&path, fast_config(10)).await;
        let customers = SourceRef::table("Customers");

        source.get_entity_record(&customers, 0).await.unwrap();
        assert!(source.release(&customers).await);
        source.get_entity_record(&customers, 0).await.unwrap();
        assert_eq!(source.started_retrievals(), 2);
    }

    #[tokio::test]
    async fn test_from_pool_rejects_zero_batch_rows() {
        let (_dir, path) = seed(1).await;
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite://{}", path))
            .await
            .unwrap();

        let result = RelationalSource::from_pool(
            pool,
            Driver::Sqlite,
            None,
            RetrievalConfig::default().with_max_batch_rows(0),
        );
        assert!(matches!(result, Err(SourceError::Config(_))));
    }

    #[tokio::test]
    async fn test_from_pool_with_database_counts() {
        let (_dir, path) = seed(25).await;
        let pool = AnyPoolOptions::new()
            .max_connections(2)
            .connect(&format!("sqlite://{}", path))
            .await
            .unwrap();

        let source =
            RelationalSource::from_pool(pool, Driver::Sqlite, Some("main".into()), fast_config(10))
                .unwrap();
        let customers = SourceRef::table("main.Customers");
        assert_eq!(source.calculate_num_of_batches(&customers).await.unwrap(), 3);
        assert_eq!(source.get_entity_record(&customers, 2).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_through_input_source_trait() {
        async fn count<S: InputSource>(source: &S, reference: &SourceRef) -> usize {
            source.calculate_num_of_batches(reference).await.unwrap()
        }

        let (_dir, path) = seed(42).await;
        let source = source_over(&path, fast_config(10)).await;
        assert_eq!(count(&source, &SourceRef::table("Customers")).await, 5);
        source.close().await;
    }
}
