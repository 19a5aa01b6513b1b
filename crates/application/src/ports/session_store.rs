use async_trait::async_trait;
use vigil_dns_domain::{DomainError, Session};

/// Persists the session table across restarts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn backup(&self, sessions: &[Session]) -> Result<(), DomainError>;

    /// Returns the previously backed-up sessions; the caller decides which
    /// ones are still valid.
    async fn restore(&self) -> Result<Vec<Session>, DomainError>;
}
