//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// The JW Library user data schema (merge-relevant tables plus `LastModified`).
static SCHEMA: &str = include_str!("../queries/create_schema.sql");

/// Handle to one `userData.db` file (or an in-memory stand-in).
///
/// Every pool holds exactly one connection: a destination has a single
/// writer, and a source is read once from start to finish.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(1)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool })
    }

    /// Create a destination database at `path`, creating the file if
    /// needed, and apply the user data schema.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::destination_options().filename(path.as_ref()).create_if_missing(true);
        let db = Self::new(options).await?;
        db.apply_schema().await?;
        Ok(db)
    }

    /// Open an existing database read-write, e.g. a template copied into
    /// place as the destination.
    ///
    /// Any of the merge tables missing from the file are created.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let db = Self::new(Self::destination_options().filename(path)).await?;
        db.apply_schema().await?;
        Ok(db)
    }

    /// Open a source snapshot. Nothing is ever written to it.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        Self::new(options).await
    }

    /// Connect to an in-memory database with the schema applied.
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let db = Self::new(Self::destination_options().filename(":memory:")).await?;
        db.apply_schema().await?;
        Ok(db)
    }

    /// Connection options for a destination: a disposable working copy, so
    /// durability is traded for speed and no journal file is left behind
    /// next to it.
    fn destination_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Memory)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Off)
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Create any missing tables. Safe to run against a populated file.
    #[instrument(level = "debug", skip(self))]
    async fn apply_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await.or_raise(|| ErrorKind::Schema)?;
        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Waits for the connection to be returned to the pool, then closes it
    /// so the file can be hashed and packaged. After calling this, the
    /// Database instance should not be used.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
