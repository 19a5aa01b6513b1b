use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub password: Option<String>,
    pub totp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub valid: bool,
    /// Whether a TOTP secret is configured (the UI then asks for a code).
    pub totp: bool,
    pub sid: Option<String>,
    pub csrf: Option<String>,
    /// Seconds of validity left; -1 when no session is involved.
    pub validity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session: SessionInfo,
    pub took: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionTlsInfo {
    pub login: bool,
    pub mixed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionListEntry {
    pub id: usize,
    pub current_session: bool,
    pub valid: bool,
    pub tls: SessionTlsInfo,
    pub login_at: i64,
    pub last_active: i64,
    pub valid_until: i64,
    pub remote_addr: String,
    pub user_agent: String,
    pub app: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionListEntry>,
    pub took: f64,
}
