use serde::{Deserialize, Serialize};

use super::api::ApiConfig;
use super::database::DatabaseConfig;
use super::dns::DnsConfig;
use super::files::FilesConfig;
use super::logging::LoggingConfig;
use super::misc::MiscConfig;
use super::server::ServerConfig;
use crate::errors::DomainError;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub misc: MiscConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, DomainError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("vigil-dns.toml").exists() {
            Self::from_file("vigil-dns.toml")?
        } else if std::path::Path::new("/etc/vigil-dns/config.toml").exists() {
            Self::from_file("/etc/vigil-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, DomainError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Config(format!("cannot read {path}: {e}")))?;
        toml::from_str(&contents).map_err(|e| DomainError::Config(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(db) = overrides.database_path {
            self.database.path = db;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.server.port == 0 {
            return Err(DomainError::Config("API port cannot be 0".to_string()));
        }
        if self.dns.ring_capacity == 0 {
            return Err(DomainError::Config(
                "query ring capacity cannot be 0".to_string(),
            ));
        }
        if self.api.max_history == 0 {
            return Err(DomainError::Config("max_history cannot be 0".to_string()));
        }
        if self.api.max_sessions == 0 {
            return Err(DomainError::Config("max_sessions cannot be 0".to_string()));
        }
        if self.misc.check.disk > 100 {
            return Err(DomainError::Config(
                "disk check threshold is a percentage".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether switching from `self` to `other` touches a key that only
    /// takes effect after a restart.
    pub fn restart_required(&self, other: &Config) -> bool {
        self.server.bind_address != other.server.bind_address
            || self.server.port != other.server.port
            || self.database.path != other.database.path
            || self.files.resolver_log != other.files.resolver_log
            || self.dns.ring_capacity != other.dns.ring_capacity
            || self.api.max_sessions != other.api.max_sessions
    }

    /// Write scalars back into the config file, preserving its comments.
    pub fn save(&self, path: &str) -> Result<(), DomainError> {
        let existing = std::fs::read_to_string(path).unwrap_or_default();

        let mut doc = existing
            .parse::<toml_edit::DocumentMut>()
            .map_err(|e| DomainError::Config(format!("cannot parse config file: {e}")))?;

        // Updates a scalar while keeping any inline comment on that line.
        fn set_val(table: &mut toml_edit::Table, key: &str, new_val: toml_edit::Value) {
            match table.get_mut(key) {
                Some(item @ toml_edit::Item::Value(_)) => {
                    let suffix = item.as_value().and_then(|v| v.decor().suffix()).cloned();
                    *item = toml_edit::Item::Value(new_val);
                    if let (Some(s), Some(v)) = (suffix, item.as_value_mut()) {
                        v.decor_mut().set_suffix(s);
                    }
                }
                Some(item) => *item = toml_edit::Item::Value(new_val),
                None => {
                    table.insert(key, toml_edit::Item::Value(new_val));
                }
            }
        }

        fn table<'a>(
            doc: &'a mut toml_edit::DocumentMut,
            key: &str,
        ) -> Option<&'a mut toml_edit::Table> {
            if !doc.contains_key(key) {
                doc.insert(key, toml_edit::Item::Table(toml_edit::Table::new()));
            }
            doc[key].as_table_mut()
        }

        if let Some(t) = table(&mut doc, "server") {
            set_val(t, "bind_address", self.server.bind_address.clone().into());
            set_val(t, "port", toml_edit::Value::from(self.server.port as i64));
        }

        if let Some(t) = table(&mut doc, "api") {
            set_val(t, "max_history", (self.api.max_history as i64).into());
            set_val(t, "session_timeout", (self.api.session_timeout as i64).into());
            set_val(t, "max_sessions", (self.api.max_sessions as i64).into());
            set_val(t, "local_api_auth", self.api.local_api_auth.into());
            set_val(t, "pwhash", self.api.pwhash.clone().into());
            set_val(t, "app_pwhash", self.api.app_pwhash.clone().into());
            set_val(t, "totp_secret", self.api.totp_secret.clone().into());
            set_val(t, "privacy_level", self.api.privacy_level.as_str().into());
        }

        if let Some(t) = table(&mut doc, "dns") {
            set_val(t, "reply_when_busy", self.dns.reply_when_busy.as_str().into());
            set_val(t, "ring_capacity", (self.dns.ring_capacity as i64).into());
            if !t.contains_key("rate_limit") {
                t.insert("rate_limit", toml_edit::Item::Table(toml_edit::Table::new()));
            }
            if let Some(rl) = t.get_mut("rate_limit").and_then(|i| i.as_table_mut()) {
                set_val(rl, "count", (self.dns.rate_limit.count as i64).into());
                set_val(rl, "interval", (self.dns.rate_limit.interval as i64).into());
            }
        }

        if let Some(t) = table(&mut doc, "database") {
            set_val(t, "path", self.database.path.clone().into());
            set_val(t, "mem_flush_interval", (self.database.mem_flush_interval as i64).into());
            set_val(t, "disk_flush_interval", (self.database.disk_flush_interval as i64).into());
            set_val(t, "max_db_days", (self.database.max_db_days as i64).into());
        }

        if let Some(t) = table(&mut doc, "files") {
            set_val(t, "resolver_log", self.files.resolver_log.clone().into());
            set_val(t, "log", self.files.log.clone().into());
        }

        if let Some(t) = table(&mut doc, "logging") {
            set_val(t, "level", self.logging.level.clone().into());
        }

        std::fs::write(path, doc.to_string())
            .map_err(|e| DomainError::Config(format!("cannot write {path}: {e}")))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub database_path: Option<String>,
    pub log_level: Option<String>,
}
