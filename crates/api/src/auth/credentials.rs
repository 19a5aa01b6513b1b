use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use vigil_dns_application::ports::{PasswordResult, PasswordVerifier};
use vigil_dns_domain::Config;

/// Failed attempts allowed per source address per window before logins from
/// it are answered with 429.
const MAX_FAILED_ATTEMPTS: u32 = 5;
const ATTEMPT_WINDOW_SECS: i64 = 60;

pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    failures: u32,
    window_start: i64,
}

/// SHA-256 password check with a per-source login attempt limiter. The
/// limiter is independent of the DNS query rate limiter.
pub struct Sha256Verifier {
    config: Arc<arc_swap::ArcSwap<Config>>,
    attempts: Mutex<HashMap<String, AttemptWindow>>,
}

impl Sha256Verifier {
    pub fn new(config: Arc<arc_swap::ArcSwap<Config>>) -> Self {
        Self {
            config,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn over_limit(&self, remote_addr: &str, now: i64) -> bool {
        let mut attempts = self.attempts.lock().unwrap_or_else(|p| p.into_inner());
        let window = attempts.entry(remote_addr.to_string()).or_insert(AttemptWindow {
            failures: 0,
            window_start: now,
        });
        if now - window.window_start >= ATTEMPT_WINDOW_SECS {
            window.failures = 0;
            window.window_start = now;
        }
        window.failures >= MAX_FAILED_ATTEMPTS
    }

    fn record_failure(&self, remote_addr: &str, now: i64) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|p| p.into_inner());
        let window = attempts.entry(remote_addr.to_string()).or_insert(AttemptWindow {
            failures: 0,
            window_start: now,
        });
        window.failures += 1;
    }

    fn clear_failures(&self, remote_addr: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(remote_addr);
    }
}

impl PasswordVerifier for Sha256Verifier {
    fn verify(&self, password: &str, remote_addr: &str, now: i64) -> PasswordResult {
        if self.over_limit(remote_addr, now) {
            debug!(remote_addr, "Login rate limited");
            return PasswordResult::RateLimited;
        }

        let cfg = self.config.load();
        let hash = hash_password(password);

        if !cfg.api.pwhash.is_empty() && constant_time_eq(&hash, &cfg.api.pwhash) {
            self.clear_failures(remote_addr);
            return PasswordResult::Correct;
        }
        if !cfg.api.app_pwhash.is_empty() && constant_time_eq(&hash, &cfg.api.app_pwhash) {
            self.clear_failures(remote_addr);
            return PasswordResult::AppCorrect;
        }

        self.record_failure(remote_addr, now);
        PasswordResult::Incorrect
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract the password from an HTTP Basic header; the username must be
/// `pi-hole`.
pub fn basic_auth_password(header: &str) -> Option<String> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    if user != "pi-hole" {
        return None;
    }
    Some(password.to_string())
}
