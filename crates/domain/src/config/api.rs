use serde::{Deserialize, Serialize};

/// Progressive suppression of API detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    ShowAll,
    HideDomains,
    HideDomainsClients,
    Maximum,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::ShowAll => "show_all",
            PrivacyLevel::HideDomains => "hide_domains",
            PrivacyLevel::HideDomainsClients => "hide_domains_clients",
            PrivacyLevel::Maximum => "maximum",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Seconds of query history kept in memory and in the mem database.
    #[serde(default = "default_max_history")]
    pub max_history: u64,

    /// Sliding session validity in seconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,

    /// Number of slots in the session table.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Require authentication for requests from loopback.
    #[serde(default)]
    pub local_api_auth: bool,

    /// Hex SHA-256 of the interactive password; empty disables authentication.
    #[serde(default)]
    pub pwhash: String,

    /// Hex SHA-256 of the application password (token logins).
    #[serde(default)]
    pub app_pwhash: String,

    /// Base32 TOTP secret; empty disables 2FA.
    #[serde(default)]
    pub totp_secret: String,

    #[serde(default)]
    pub privacy_level: PrivacyLevel,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            session_timeout: default_session_timeout(),
            max_sessions: default_max_sessions(),
            local_api_auth: false,
            pwhash: String::new(),
            app_pwhash: String::new(),
            totp_secret: String::new(),
            privacy_level: PrivacyLevel::ShowAll,
        }
    }
}

fn default_max_history() -> u64 {
    86400
}

fn default_session_timeout() -> u64 {
    300
}

fn default_max_sessions() -> usize {
    16
}
