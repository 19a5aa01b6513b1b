use ring::rand::SystemRandom;
use std::sync::Mutex;
use tracing::{debug, warn};
use vigil_dns_domain::session::{REMOTE_ADDR_MAX, USER_AGENT_MAX};
use vigil_dns_domain::{DomainError, Session};

use super::tokens::generate_token;

/// Fixed-size table of authenticated sessions. Slots are reclaimed lazily:
/// a login scans for the first unused or expired slot.
pub struct SessionTable {
    slots: Mutex<Vec<Session>>,
    rng: SystemRandom,
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            slots: Mutex::new(vec![Session::default(); max_sessions]),
            rng: SystemRandom::new(),
        }
    }

    /// Issue a new session. Expired slots are freed during the scan; with
    /// every slot in live use the login is denied.
    #[allow(clippy::too_many_arguments)]
    pub fn login(
        &self,
        remote_addr: &str,
        user_agent: &str,
        is_tls: bool,
        app: bool,
        now: i64,
        timeout: u64,
    ) -> Result<(usize, Session), DomainError> {
        let mut slots = self.lock();

        for slot in slots.iter_mut() {
            if slot.used && slot.valid_until < now {
                debug!(remote_addr = %slot.remote_addr, "Freeing expired session slot");
                slot.clear();
            }
        }

        let Some(idx) = slots.iter().position(|s| !s.used) else {
            warn!("No free API seats available, not authenticating client");
            return Err(DomainError::NoSessionSlots);
        };

        // On the astronomically unlikely SID collision, mint a fresh one
        // instead of silently overwriting the older session.
        let sid = loop {
            let token = generate_token(&self.rng)
                .ok_or_else(|| DomainError::Internal("system RNG failure".to_string()))?;
            if !slots.iter().any(|s| s.used && s.sid == token) {
                break token;
            }
        };
        let csrf = generate_token(&self.rng)
            .ok_or_else(|| DomainError::Internal("system RNG failure".to_string()))?;

        let slot = &mut slots[idx];
        slot.used = true;
        slot.app = app;
        slot.tls.login = is_tls;
        slot.tls.mixed = false;
        slot.login_at = now;
        slot.valid_until = now + timeout as i64;
        slot.sid = sid;
        slot.csrf = csrf;
        slot.remote_addr = truncate(remote_addr, REMOTE_ADDR_MAX);
        slot.user_agent = truncate(user_agent, USER_AGENT_MAX);

        Ok((idx, slot.clone()))
    }

    /// Validate a presented SID. On success the expiry slides forward and
    /// the slot remembers whether transport security ever changed.
    #[allow(clippy::too_many_arguments)]
    pub fn check(
        &self,
        sid: &str,
        remote_addr: &str,
        need_csrf: bool,
        csrf: Option<&str>,
        is_tls: bool,
        now: i64,
        timeout: u64,
    ) -> Option<(usize, Session)> {
        let mut slots = self.lock();
        for (idx, slot) in slots.iter_mut().enumerate() {
            if slot.used
                && slot.valid_until >= now
                && slot.remote_addr == remote_addr
                && slot.sid == sid
            {
                if need_csrf && csrf != Some(slot.csrf.as_str()) {
                    debug!("Session rejected: CSRF token mismatch");
                    return None;
                }
                slot.valid_until = now + timeout as i64;
                slot.tls.mixed |= is_tls != slot.tls.login;
                return Some((idx, slot.clone()));
            }
        }
        None
    }

    pub fn get(&self, idx: usize) -> Option<Session> {
        self.lock().get(idx).filter(|s| s.used).cloned()
    }

    pub fn logout(&self, idx: usize) {
        if let Some(slot) = self.lock().get_mut(idx) {
            slot.clear();
        }
    }

    /// Revoke by slot id, for the admin sessions endpoint.
    pub fn revoke(&self, idx: usize) -> Result<(), DomainError> {
        let mut slots = self.lock();
        match slots.get_mut(idx) {
            Some(slot) if slot.used => {
                slot.clear();
                Ok(())
            }
            Some(_) => Err(DomainError::BadRequest("Session ID not in use".to_string())),
            None => Err(DomainError::BadRequest("Session ID out of bounds".to_string())),
        }
    }

    pub fn list(&self) -> Vec<(usize, Session)> {
        self.lock()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.used)
            .map(|(i, s)| (i, s.clone()))
            .collect()
    }

    pub fn wipe(&self) {
        for slot in self.lock().iter_mut() {
            slot.clear();
        }
    }

    /// Snapshot for persistence on shutdown.
    pub fn snapshot(&self) -> Vec<Session> {
        self.lock().clone()
    }

    /// Fill slots from a persisted snapshot, skipping entries that expired
    /// while the process was down.
    pub fn restore(&self, sessions: Vec<Session>, now: i64) -> usize {
        let mut slots = self.lock();
        let mut restored = 0;
        for session in sessions.into_iter().filter(|s| s.is_valid(now)) {
            let Some(slot) = slots.iter_mut().find(|s| !s.used) else {
                break;
            };
            *slot = session;
            restored += 1;
        }
        restored
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Session>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
