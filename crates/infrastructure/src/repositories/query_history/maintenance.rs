use sqlx::SqlitePool;
use tracing::debug;
use vigil_dns_domain::DomainError;

use crate::database::db_err;

/// Trim a queries table; used for both tiers with their respective cutoffs.
pub(super) async fn delete_older_than(
    pool: &SqlitePool,
    mintime: f64,
) -> Result<u64, DomainError> {
    let result = sqlx::query("DELETE FROM queries WHERE timestamp < ?")
        .bind(mintime)
        .execute(pool)
        .await
        .map_err(db_err)?;
    let deleted = result.rows_affected();
    if deleted > 0 {
        debug!(deleted, mintime, "Deleted aged-out queries");
    }
    Ok(deleted)
}

/// Copy everything above the disk high-water mark from the mem tier into the
/// long-term database, side tables included. Runs on the mem connection with
/// the disk file attached so the copy is a single SQL statement.
pub(super) async fn mirror_to_disk(mem: &SqlitePool, disk_path: &str) -> Result<u64, DomainError> {
    let mut conn = mem.acquire().await.map_err(db_err)?;

    sqlx::query("ATTACH DATABASE ? AS disk")
        .bind(disk_path)
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::Internal(format!("cannot attach disk database: {e}")))?;

    let copy = async {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO disk.queries \
             SELECT * FROM queries \
             WHERE id > (SELECT COALESCE(MAX(id), 0) FROM disk.queries)",
        )
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "INSERT OR IGNORE INTO disk.domain_by_id (domain) SELECT domain FROM domain_by_id",
        )
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
        sqlx::query(
            "INSERT OR IGNORE INTO disk.client_by_id (ip, name) SELECT ip, name FROM client_by_id",
        )
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
        sqlx::query(
            "INSERT OR IGNORE INTO disk.forward_by_id (forward) SELECT forward FROM forward_by_id",
        )
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

        Ok::<u64, DomainError>(result.rows_affected())
    }
    .await;

    let detach = sqlx::query("DETACH DATABASE disk").execute(&mut *conn).await;
    if let Err(e) = detach {
        return Err(DomainError::Internal(format!(
            "cannot detach disk database: {e}"
        )));
    }

    copy
}

pub(super) async fn log_message(
    pool: &SqlitePool,
    kind: &str,
    message: &str,
) -> Result<(), DomainError> {
    sqlx::query("INSERT INTO message (timestamp, type, message) VALUES (?, ?, ?)")
        .bind(chrono::Utc::now().timestamp())
        .bind(kind)
        .bind(message)
        .execute(pool)
        .await
        .map_err(db_err)?;
    Ok(())
}
