use sqlx::SqlitePool;
use tracing::debug;
use vigil_dns_domain::{DomainError, QueryRow};

use crate::database::db_err;

// SQLite allows 999 bound parameters per statement.
const COLS_PER_ROW: usize = 14;
const ROWS_PER_CHUNK: usize = 999 / COLS_PER_ROW;

fn build_multi_insert_sql(n: usize) -> String {
    debug_assert!(n > 0 && n <= ROWS_PER_CHUNK);
    const HEADER: &str = "INSERT OR REPLACE INTO queries \
        (id, timestamp, type, status, domain, client, forward, additional_info, \
         reply_type, reply_time, dnssec, client_name, ttl, regex_id) \
        VALUES ";
    const PLACEHOLDER: &str = "(?,?,?,?,?,?,?,?,?,?,?,?,?,?)";
    let mut sql = String::with_capacity(HEADER.len() + n * (PLACEHOLDER.len() + 1));
    sql.push_str(HEADER);
    for i in 0..n {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(PLACEHOLDER);
    }
    sql
}

/// Write a batch of dirty queries into the mem table. Re-flushes of the same
/// id replace the earlier row, so status refinements land as updates.
/// The suggestion side tables pick up any value not seen before.
pub(super) async fn store_queries(pool: &SqlitePool, rows: &[QueryRow]) -> Result<u64, DomainError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.map_err(db_err)?;

    let mut stored = 0u64;
    for chunk in rows.chunks(ROWS_PER_CHUNK) {
        let sql = build_multi_insert_sql(chunk.len());
        let mut q = sqlx::query(&sql);
        for row in chunk {
            q = q
                .bind(row.id)
                .bind(row.timestamp)
                .bind(row.qtype)
                .bind(row.status)
                .bind(row.domain.as_str())
                .bind(row.client.as_str())
                .bind(row.forward.as_deref())
                .bind(row.additional_info.as_deref())
                .bind(row.reply_type)
                .bind(row.reply_time)
                .bind(row.dnssec)
                .bind(row.client_name.as_deref())
                .bind(row.ttl)
                .bind(row.regex_id);
        }
        let result = q.execute(&mut *tx).await.map_err(db_err)?;
        stored += result.rows_affected();
    }

    for row in rows {
        sqlx::query("INSERT OR IGNORE INTO domain_by_id (domain) VALUES (?)")
            .bind(row.domain.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("INSERT OR IGNORE INTO client_by_id (ip, name) VALUES (?, ?)")
            .bind(row.client.as_str())
            .bind(row.client_name.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if let Some(forward) = row.forward.as_deref() {
            sqlx::query("INSERT OR IGNORE INTO forward_by_id (forward) VALUES (?)")
                .bind(forward)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
    }

    tx.commit().await.map_err(db_err)?;

    debug!(stored, "Flushed query batch");
    Ok(stored)
}
