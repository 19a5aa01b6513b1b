/// Outcome of a login password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordResult {
    Correct,
    /// Matched the application password; skips 2FA.
    AppCorrect,
    Incorrect,
    /// The source address exhausted its login attempts.
    RateLimited,
}

/// Pluggable password verification for the login endpoint.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str, remote_addr: &str, now: i64) -> PasswordResult;
}
