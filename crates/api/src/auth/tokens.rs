use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};

/// 32 bytes from the system CSPRNG, base64-encoded: 43 printable characters
/// from the base64 alphabet. Used for both SIDs and CSRF tokens.
pub(super) fn generate_token(rng: &SystemRandom) -> Option<String> {
    let mut raw = [0u8; 32];
    rng.fill(&mut raw).ok()?;
    Some(STANDARD_NO_PAD.encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_dns_domain::session::TOKEN_LEN;

    #[test]
    fn tokens_have_the_documented_shape() {
        let rng = SystemRandom::new();
        let token = generate_token(&rng).unwrap();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/'));
    }

    #[test]
    fn tokens_are_unique() {
        let rng = SystemRandom::new();
        let a = generate_token(&rng).unwrap();
        let b = generate_token(&rng).unwrap();
        assert_ne!(a, b);
    }
}
