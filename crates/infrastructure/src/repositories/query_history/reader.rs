use futures::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use vigil_dns_application::ports::{DbCounts, QueryLogFilters, QueryLogPage, SuggestionLists};
use vigil_dns_domain::{DomainError, QueryRow};

use crate::database::{db_err, QUERY_COLS};

enum Bind {
    F(f64),
    I(i64),
    S(String),
}

pub(super) async fn counts(mem: &SqlitePool, disk: &SqlitePool) -> Result<DbCounts, DomainError> {
    let mem_row = sqlx::query("SELECT COALESCE(MAX(id), 0), COUNT(*) FROM queries")
        .fetch_one(mem)
        .await
        .map_err(db_err)?;
    let disk_row = sqlx::query("SELECT COALESCE(MAX(id), 0), COUNT(*) FROM queries")
        .fetch_one(disk)
        .await
        .map_err(db_err)?;

    let mem_max: i64 = mem_row.try_get(0).map_err(db_err)?;
    let mem_rows: i64 = mem_row.try_get(1).map_err(db_err)?;
    let disk_max: i64 = disk_row.try_get(0).map_err(db_err)?;
    let disk_rows: i64 = disk_row.try_get(1).map_err(db_err)?;

    Ok(DbCounts {
        largest_id: mem_max.max(disk_max),
        mem_rows: mem_rows as u64,
        disk_rows: disk_rows as u64,
    })
}

/// Filtered, cursor-stable read of the query log.
///
/// The cursor pins the tip of the table: rows with a larger id are skipped so
/// queries arriving between two pages cannot shift the result window. Skipped
/// rows still count toward the `start` offset and `recordsFiltered`.
pub(super) async fn query_log(
    mem: &SqlitePool,
    disk: &SqlitePool,
    disk_path: &str,
    filters: &QueryLogFilters,
) -> Result<QueryLogPage, DomainError> {
    let totals = counts(mem, disk).await?;

    let (cursor, cursor_set) = match filters.cursor {
        Some(c) if c <= totals.largest_id => (c, true),
        Some(c) => {
            return Err(DomainError::InvalidCursor(format!(
                "cursor {c} is beyond the largest database index {}",
                totals.largest_id
            )))
        }
        None => (totals.largest_id, false),
    };

    let mut sql = format!(
        "SELECT {QUERY_COLS} FROM {}",
        if filters.disk { "disk.queries" } else { "queries" }
    );
    let mut binds: Vec<Bind> = Vec::new();
    let mut has_where = false;
    let mut add_clause = |sql: &mut String, clause: &str, bind: Bind, binds: &mut Vec<Bind>| {
        sql.push_str(if has_where { " AND " } else { " WHERE " });
        sql.push_str(clause);
        binds.push(bind);
        has_where = true;
    };

    if let Some(from) = filters.from {
        add_clause(&mut sql, "timestamp >= ?", Bind::F(from), &mut binds);
    }
    if let Some(until) = filters.until {
        add_clause(&mut sql, "timestamp < ?", Bind::F(until), &mut binds);
    }
    if let Some(domain) = &filters.domain {
        add_clause(&mut sql, "domain = ?", Bind::S(domain.clone()), &mut binds);
    }
    if let Some(client) = &filters.client {
        add_clause(&mut sql, "client = ?", Bind::S(client.clone()), &mut binds);
    }
    if let Some(upstream) = &filters.upstream {
        add_clause(&mut sql, "forward = ?", Bind::S(upstream.clone()), &mut binds);
    }
    if let Some(qtype) = filters.qtype {
        add_clause(&mut sql, "type = ?", Bind::I(qtype), &mut binds);
    }
    if let Some(status) = filters.status {
        add_clause(&mut sql, "status = ?", Bind::I(status), &mut binds);
    }
    if let Some(reply) = filters.reply {
        add_clause(&mut sql, "reply_type = ?", Bind::I(reply), &mut binds);
    }
    if let Some(dnssec) = filters.dnssec {
        add_clause(&mut sql, "dnssec = ?", Bind::I(dnssec), &mut binds);
    }

    sql.push_str(" ORDER BY id DESC");

    debug!(sql = %sql, cursor, start = filters.start, length = filters.length, "Query log read");

    let mut conn = mem.acquire().await.map_err(db_err)?;

    if filters.disk {
        sqlx::query("ATTACH DATABASE ? AS disk")
            .bind(disk_path)
            .execute(&mut *conn)
            .await
            .map_err(|e| DomainError::Internal(format!("cannot attach disk database: {e}")))?;
    }

    let streamed = stream_rows(&mut conn, &sql, binds, cursor, filters).await;

    if filters.disk {
        // Always detach before handing the connection back.
        let detach = sqlx::query("DETACH DATABASE disk").execute(&mut *conn).await;
        if let Err(e) = detach {
            return Err(DomainError::Internal(format!(
                "cannot detach disk database: {e}"
            )));
        }
    }

    let (queries, records_filtered, first_id) = streamed?;

    Ok(QueryLogPage {
        queries,
        cursor: if cursor_set { Some(cursor) } else { first_id },
        records_total: if filters.disk {
            totals.disk_rows
        } else {
            totals.mem_rows
        },
        records_filtered,
        draw: filters.draw,
    })
}

async fn stream_rows(
    conn: &mut sqlx::pool::PoolConnection<sqlx::Sqlite>,
    sql: &str,
    binds: Vec<Bind>,
    cursor: i64,
    filters: &QueryLogFilters,
) -> Result<(Vec<QueryRow>, u64, Option<i64>), DomainError> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::F(v) => query.bind(v),
            Bind::I(v) => query.bind(v),
            Bind::S(v) => query.bind(v),
        };
    }

    let mut rows = query.fetch(&mut **conn);

    let mut queries = Vec::new();
    let mut records = 0u64;
    let mut added = 0u64;
    let mut first_id = None;

    while let Some(row) = rows.try_next().await.map_err(db_err)? {
        let id: i64 = row.try_get(0).map_err(db_err)?;
        if first_id.is_none() {
            first_id = Some(id);
        }
        records += 1;

        if id > cursor {
            // Tip of the table moved since the cursor was taken.
            continue;
        }
        if filters.start > 0 && filters.start >= records {
            continue;
        }
        if filters.length >= 0 && added >= filters.length as u64 {
            // A negative length streams everything.
            continue;
        }

        queries.push(row_to_query(&row)?);
        added += 1;
    }

    Ok((queries, records, first_id))
}

fn row_to_query(row: &SqliteRow) -> Result<QueryRow, DomainError> {
    Ok(QueryRow {
        id: row.try_get(0).map_err(db_err)?,
        timestamp: row.try_get(1).map_err(db_err)?,
        qtype: row.try_get(2).map_err(db_err)?,
        status: row.try_get(3).map_err(db_err)?,
        domain: row.try_get(4).map_err(db_err)?,
        client: row.try_get(5).map_err(db_err)?,
        forward: row.try_get(6).map_err(db_err)?,
        additional_info: row.try_get(7).map_err(db_err)?,
        reply_type: row.try_get(8).map_err(db_err)?,
        reply_time: row.try_get(9).map_err(db_err)?,
        dnssec: row.try_get(10).map_err(db_err)?,
        client_name: row.try_get(11).map_err(db_err)?,
        ttl: row.try_get(12).map_err(db_err)?,
        regex_id: row.try_get(13).map_err(db_err)?,
    })
}

async fn strings_from(
    pool: &SqlitePool,
    sql: &str,
    limit: i64,
) -> Result<Vec<String>, DomainError> {
    let rows = sqlx::query(sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(db_err)?;
    rows.iter()
        .map(|row| row.try_get::<String, _>(0).map_err(db_err))
        .collect()
}

/// Observed values for the autocomplete endpoint. The client count is split
/// between addresses and names, mirroring how the side table is keyed.
pub(super) async fn suggestions(
    mem: &SqlitePool,
    count: u32,
) -> Result<SuggestionLists, DomainError> {
    let count = count as i64;
    let domains = strings_from(mem, "SELECT domain FROM domain_by_id LIMIT ?", count).await?;

    let mut clients = strings_from(
        mem,
        "SELECT DISTINCT(ip) FROM client_by_id LIMIT ?",
        count / 2,
    )
    .await?;
    clients.extend(
        strings_from(
            mem,
            "SELECT DISTINCT(name) FROM client_by_id WHERE name IS NOT NULL LIMIT ?",
            count / 2,
        )
        .await?,
    );

    let upstreams = strings_from(mem, "SELECT forward FROM forward_by_id LIMIT ?", count).await?;

    Ok(SuggestionLists {
        domains,
        clients,
        upstreams,
    })
}
