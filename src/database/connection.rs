use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    config::DatabaseConfig,
    error::{AppError, Result},
};

const RETRY_DELAY: Duration = Duration::from_secs(5);

const CREATE_FOODS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS foods (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        brand VARCHAR(255) NOT NULL,
        price DECIMAL(10, 2) NOT NULL,
        stock INTEGER NOT NULL DEFAULT 0,
        category VARCHAR(255) NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

/// Shared database handle: a bounded connection pool plus a readiness gate.
///
/// The pool is built lazily, so construction never touches the network.
/// A background task establishes the schema and flips the handle to ready;
/// until then every data operation fails with `AppError::NotReady`.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    ready: Arc<AtomicBool>,
    statement_timeout: Duration,
}

impl Database {
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(&config.url)?;

        let db = Self {
            pool,
            ready: Arc::new(AtomicBool::new(false)),
            statement_timeout: Duration::from_millis(config.statement_timeout_ms),
        };

        tokio::spawn(ensure_schema(db.pool.clone(), db.ready.clone()));

        Ok(db)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Pool accessor for query code. Not-yet-initialized and closed handles
    /// surface as `NotReady` rather than a failed statement.
    pub fn pool(&self) -> Result<&PgPool> {
        if self.pool.is_closed() || !self.is_ready() {
            return Err(AppError::NotReady);
        }
        Ok(&self.pool)
    }

    /// Runs a single statement under the configured deadline. A stalled
    /// store call is cut off and surfaced as `Timeout` instead of hanging
    /// its caller.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.statement_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Timeout),
        }
    }

    /// Closes the pool. Safe to call more than once.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

/// Idempotent schema setup with unbounded fixed-delay retry. Failure here is
/// never surfaced to callers; an unreachable store leaves the service up with
/// every data operation failing individually until a retry succeeds.
async fn ensure_schema(pool: PgPool, ready: Arc<AtomicBool>) {
    loop {
        if pool.is_closed() {
            return;
        }

        match sqlx::query(CREATE_FOODS_TABLE).execute(&pool).await {
            Ok(_) => {
                ready.store(true, Ordering::Release);
                tracing::info!("Connected to PostgreSQL, foods table ready");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    "Database initialization failed, retrying in {}s: {}",
                    RETRY_DELAY.as_secs(),
                    e
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Readiness probe. Any store-side failure, including one after the handle
/// first became ready, reports the service as not ready rather than as an
/// internal error.
pub async fn check_health(db: &Database) -> Result<()> {
    let pool = db.pool()?;

    if let Err(e) = db.run(sqlx::query("SELECT 1").execute(pool)).await {
        tracing::warn!("Readiness probe failed: {}", e);
        return Err(AppError::NotReady);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config(timeout_ms: u64) -> DatabaseConfig {
        DatabaseConfig {
            url: "postgresql://127.0.0.1:1/petstore".to_string(),
            max_connections: 1,
            statement_timeout_ms: timeout_ms,
        }
    }

    #[tokio::test]
    async fn handle_starts_not_ready() {
        let db = Database::connect(&unreachable_config(100)).unwrap();

        assert!(!db.is_ready());
        assert!(matches!(db.pool(), Err(AppError::NotReady)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let db = Database::connect(&unreachable_config(100)).unwrap();

        db.close().await;
        db.close().await;

        assert!(matches!(db.pool(), Err(AppError::NotReady)));
    }

    #[tokio::test]
    async fn deadline_bounds_stalled_operations() {
        let db = Database::connect(&unreachable_config(50)).unwrap();

        let result: Result<()> = db
            .run(std::future::pending::<std::result::Result<(), sqlx::Error>>())
            .await;

        assert!(matches!(result, Err(AppError::Timeout)));
    }

    #[tokio::test]
    async fn readiness_check_fails_before_initialization() {
        let db = Database::connect(&unreachable_config(100)).unwrap();

        assert!(matches!(check_health(&db).await, Err(AppError::NotReady)));
    }

    #[tokio::test]
    async fn readiness_check_reports_not_ready_when_store_drops() {
        let db = Database::connect(&unreachable_config(200)).unwrap();

        // Handle became ready, then the store went away: the probe failure
        // must still surface as not-ready, not as an internal error.
        db.mark_ready();

        assert!(matches!(check_health(&db).await, Err(AppError::NotReady)));
    }
}
