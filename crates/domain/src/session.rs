use serde::{Deserialize, Serialize};

/// Upper bound kept from the fixed-size session table; the remote address
/// and user agent are truncated to these lengths on store.
pub const REMOTE_ADDR_MAX: usize = 47;
pub const USER_AGENT_MAX: usize = 127;

/// Length of SID and CSRF tokens: 32 random bytes, base64 without padding.
pub const TOKEN_LEN: usize = 43;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTls {
    /// Whether the session was established over TLS.
    pub login: bool,
    /// Set once any request for this session arrived with a different
    /// transport security than the login did.
    pub mixed: bool,
}

/// One slot of the fixed-size session table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub used: bool,
    /// Authenticated with the app password rather than the interactive one.
    pub app: bool,
    pub tls: SessionTls,
    pub login_at: i64,
    pub valid_until: i64,
    pub sid: String,
    pub csrf: String,
    pub remote_addr: String,
    pub user_agent: String,
}

impl Session {
    pub fn is_valid(&self, now: i64) -> bool {
        self.used && self.valid_until >= now
    }

    /// Zero the slot; also invalidates it.
    pub fn clear(&mut self) {
        *self = Session::default();
    }
}
