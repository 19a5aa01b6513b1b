use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use vigil_dns_application::ports::SessionStore;
use vigil_dns_domain::session::SessionTls;
use vigil_dns_domain::{DomainError, Session};

use crate::database::db_err;

/// Persists the session table in the long-term database so a clean restart
/// does not log everyone out.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn backup(&self, sessions: &[Session]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM session")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let mut stored = 0;
        for session in sessions.iter().filter(|s| s.used) {
            sqlx::query(
                "INSERT INTO session \
                 (login_at, valid_until, remote_addr, user_agent, sid, csrf, \
                  tls_login, tls_mixed, app) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(session.login_at)
            .bind(session.valid_until)
            .bind(session.remote_addr.as_str())
            .bind(session.user_agent.as_str())
            .bind(session.sid.as_str())
            .bind(session.csrf.as_str())
            .bind(session.tls.login as i64)
            .bind(session.tls.mixed as i64)
            .bind(session.app as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            stored += 1;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(stored, "Backed up sessions");
        Ok(())
    }

    async fn restore(&self) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(
            "SELECT login_at, valid_until, remote_addr, user_agent, sid, csrf, \
             tls_login, tls_mixed, app FROM session",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(Session {
                used: true,
                app: row.try_get::<i64, _>(8).map_err(db_err)? != 0,
                tls: SessionTls {
                    login: row.try_get::<i64, _>(6).map_err(db_err)? != 0,
                    mixed: row.try_get::<i64, _>(7).map_err(db_err)? != 0,
                },
                login_at: row.try_get(0).map_err(db_err)?,
                valid_until: row.try_get(1).map_err(db_err)?,
                sid: row.try_get(4).map_err(db_err)?,
                csrf: row.try_get(5).map_err(db_err)?,
                remote_addr: row.try_get(2).map_err(db_err)?,
                user_agent: row.try_get(3).map_err(db_err)?,
            });
        }
        Ok(sessions)
    }
}
