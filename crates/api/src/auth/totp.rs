use ring::hmac;

/// RFC 6238 time step.
const STEP_SECS: i64 = 30;
const DIGITS: u32 = 6;

/// Verify a TOTP code against the configured base32 secret, accepting one
/// step of clock skew in either direction.
pub fn verify_totp(secret_base32: &str, code: i64, now: i64) -> bool {
    let Some(key) = base32_decode(secret_base32) else {
        return false;
    };
    if key.is_empty() || !(0..1_000_000).contains(&code) {
        return false;
    }

    let counter = now / STEP_SECS;
    for offset in [-1i64, 0, 1] {
        let c = counter + offset;
        if c >= 0 && hotp(&key, c as u64) == code as u32 {
            return true;
        }
    }
    false
}

/// RFC 4226 HMAC-based one-time password, SHA-1 with dynamic truncation.
fn hotp(key: &[u8], counter: u64) -> u32 {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    let tag = hmac::sign(&key, &counter.to_be_bytes());
    let digest = tag.as_ref();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    binary % 10u32.pow(DIGITS)
}

/// RFC 4648 base32, case-insensitive, padding optional.
fn base32_decode(input: &str) -> Option<Vec<u8>> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    let mut bits = 0u32;
    let mut bit_count = 0u32;
    let mut out = Vec::with_capacity(input.len() * 5 / 8);

    for c in input.chars() {
        if c == '=' || c == ' ' {
            continue;
        }
        let upper = c.to_ascii_uppercase() as u8;
        let value = ALPHABET.iter().position(|&a| a == upper)? as u32;
        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
            bits &= (1 << bit_count) - 1;
        }
    }

    Some(out)
}
