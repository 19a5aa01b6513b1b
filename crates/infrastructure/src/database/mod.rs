use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;
use vigil_dns_domain::config::DatabaseConfig;
use vigil_dns_domain::DomainError;

/// Bumped whenever the table layout changes; recorded in the `meta` table of
/// the long-term database.
pub const SCHEMA_VERSION: i64 = 1;

/// Column list of the query tables; the order is identical everywhere a
/// query row is read or written.
pub const QUERY_COLS: &str = "id, timestamp, type, status, domain, client, forward, \
     additional_info, reply_type, reply_time, dnssec, client_name, ttl, regex_id";

const QUERIES_DDL: &str = "CREATE TABLE IF NOT EXISTS queries ( \
        id INTEGER PRIMARY KEY, \
        timestamp REAL NOT NULL, \
        type INTEGER NOT NULL, \
        status INTEGER NOT NULL, \
        domain TEXT NOT NULL, \
        client TEXT NOT NULL, \
        forward TEXT, \
        additional_info TEXT, \
        reply_type INTEGER NOT NULL DEFAULT 0, \
        reply_time REAL NOT NULL DEFAULT 0, \
        dnssec INTEGER NOT NULL DEFAULT 0, \
        client_name TEXT, \
        ttl INTEGER NOT NULL DEFAULT 0, \
        regex_id INTEGER \
    )";

const SIDE_TABLES_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS domain_by_id ( \
        id INTEGER PRIMARY KEY AUTOINCREMENT, domain TEXT NOT NULL UNIQUE)",
    "CREATE TABLE IF NOT EXISTS client_by_id ( \
        id INTEGER PRIMARY KEY AUTOINCREMENT, ip TEXT NOT NULL, name TEXT, \
        UNIQUE(ip, name))",
    "CREATE TABLE IF NOT EXISTS forward_by_id ( \
        id INTEGER PRIMARY KEY AUTOINCREMENT, forward TEXT NOT NULL UNIQUE)",
];

/// Single-connection pool over a private in-memory database. One connection
/// keeps every reader on the same handle, which is what makes the
/// ATTACH/DETACH protocol for disk reads safe.
pub async fn create_mem_pool() -> Result<SqlitePool, DomainError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(db_err)?
        .journal_mode(SqliteJournalMode::Memory)
        .synchronous(SqliteSynchronous::Off);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        // The connection owns the database; dropping it would drop the data.
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(db_err)?;

    sqlx::query(QUERIES_DDL).execute(&pool).await.map_err(db_err)?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queries_timestamp ON queries(timestamp)")
        .execute(&pool)
        .await
        .map_err(db_err)?;
    for ddl in SIDE_TABLES_DDL {
        sqlx::query(ddl).execute(&pool).await.map_err(db_err)?;
    }

    Ok(pool)
}

/// WAL-journaled pool over the long-term database file.
pub async fn create_disk_pool(cfg: &DatabaseConfig) -> Result<SqlitePool, DomainError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.path))
        .map_err(db_err)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(cfg.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(cfg.busy_timeout_secs))
        .connect_with(options)
        .await
        .map_err(db_err)?;

    create_disk_schema(&pool).await?;

    Ok(pool)
}

async fn create_disk_schema(pool: &SqlitePool) -> Result<(), DomainError> {
    sqlx::query(QUERIES_DDL).execute(pool).await.map_err(db_err)?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queries_timestamp ON queries(timestamp)")
        .execute(pool)
        .await
        .map_err(db_err)?;
    for ddl in SIDE_TABLES_DDL {
        sqlx::query(ddl).execute(pool).await.map_err(db_err)?;
    }
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS session ( \
            id INTEGER PRIMARY KEY, \
            login_at INTEGER NOT NULL, \
            valid_until INTEGER NOT NULL, \
            remote_addr TEXT NOT NULL, \
            user_agent TEXT NOT NULL DEFAULT '', \
            sid TEXT NOT NULL, \
            csrf TEXT NOT NULL, \
            tls_login INTEGER NOT NULL DEFAULT 0, \
            tls_mixed INTEGER NOT NULL DEFAULT 0, \
            app INTEGER NOT NULL DEFAULT 0 \
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS message ( \
            id INTEGER PRIMARY KEY AUTOINCREMENT, \
            timestamp INTEGER NOT NULL, \
            type TEXT NOT NULL, \
            message TEXT NOT NULL \
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;
    sqlx::query("CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
        .execute(pool)
        .await
        .map_err(db_err)?;
    sqlx::query("INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?)")
        .bind(SCHEMA_VERSION.to_string())
        .execute(pool)
        .await
        .map_err(db_err)?;
    Ok(())
}

pub(crate) fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::Database(e.to_string())
}
