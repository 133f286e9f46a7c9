use std::time::Duration;

use diesel::{
    connection::SimpleConnection,
    r2d2::{self, CustomizeConnection},
    sqlite::SqliteConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use tracing::{debug, error, info};

pub mod hospitals;
pub mod models;
pub mod schema;
pub mod users;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type ConnectionManager = r2d2::ConnectionManager<SqliteConnection>;
type ConnectionPool = r2d2::Pool<ConnectionManager>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("query failed: {0}")]
    Query(diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::PoolError),

    #[error("connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("stored data is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database task failed: {0}")]
    Task(String),
}

impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::NotFound => DbError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DbError::UniqueViolation(info.message().to_string())
            }
            other => DbError::Query(other),
        }
    }
}

/// Per-connection settings. SQLite keeps these per connection, so they are
/// applied every time the pool hands one out.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

/// Database-wide settings that survive reconnects.
fn initialize_database(conn: &mut SqliteConnection) -> Result<(), DbError> {
    conn.batch_execute(
        r#"
PRAGMA journal_mode = WAL;  -- readers do not block the single writer
PRAGMA synchronous = NORMAL;
PRAGMA encoding = 'UTF-8';
"#,
    )?;
    Ok(())
}

/// Maps `DATABASE_URL` onto a SQLite path. Three slashes mean a relative
/// path, four an absolute one.
pub fn sqlite_path(url: &str) -> &str {
    if let Some(path) = url.strip_prefix("sqlite:///") {
        path
    } else if let Some(path) = url.strip_prefix("sqlite://") {
        path
    } else if let Some(path) = url.strip_prefix("sqlite:") {
        path
    } else {
        url
    }
}

#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn connect(url: &str, pool_size: u32) -> Result<Self, DbError> {
        let path = sqlite_path(url);
        info!("Connecting to SQLite database at {}", path);

        // Fail early on an inaccessible file instead of letting r2d2 retry.
        use diesel::Connection as _;
        let mut conn = SqliteConnection::establish(path)?;
        initialize_database(&mut conn)?;
        drop(conn);

        let manager = ConnectionManager::new(path);
        let pool = ConnectionPool::builder()
            .max_size(pool_size)
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout: Duration::from_secs(5),
            }))
            .build(manager)
            .map_err(|e| {
                error!("Failed to build connection pool: {}", e);
                DbError::Pool(e)
            })?;

        Ok(Self { pool })
    }

    pub fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running embedded database migrations");
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::Migration(e.to_string()))?;
        debug!("Applied {} migration(s)", applied.len());
        Ok(())
    }

    /// Runs `f` with a pooled connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| DbError::Task(e.to_string()))?
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_path() {
        assert_eq!(sqlite_path("sqlite:///./default.db"), "./default.db");
        assert_eq!(sqlite_path("sqlite:////var/lib/healxir.db"), "/var/lib/healxir.db");
        assert_eq!(sqlite_path("sqlite://./healxir.db"), "./healxir.db");
        assert_eq!(sqlite_path("sqlite:healxir.db"), "healxir.db");
        assert_eq!(sqlite_path("/tmp/healxir.db"), "/tmp/healxir.db");
    }
}
