use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const SESSION_TTL_DAYS: i64 = 30;
pub const INVITE_TTL_DAYS: i64 = 7;

/// Salted digest stored as `salt$hex`. Password-scheme hardening is
/// delegated to the deployment; the service only needs a stable check.
pub fn hash_password(password: &str) -> String {
    let salt = random_token(16);
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hash)) => digest(salt, password) == hash,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_CHARS[rng.gen_range(0..TOKEN_CHARS.len())] as char)
        .collect()
}

pub fn new_session_token() -> String {
    random_token(48)
}

pub fn new_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| INVITE_CHARS[rng.gen_range(0..INVITE_CHARS.len())] as char)
        .collect()
}

/// Portfolio slug from the email local part: lowercase, non-alphanumerics
/// collapsed to single dashes, no leading or trailing dash.
pub fn slug_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let mut slug = String::with_capacity(local.len());
    let mut last_dash = true;

    for c in local.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("portfolio");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let stored = hash_password("hunter2hunter2");
        assert!(verify_password("hunter2hunter2", &stored));
        assert!(!verify_password("wrong", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password");
        let b = hash_password("same-password");
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-valid-record"));
    }

    #[test]
    fn invite_codes_use_expected_alphabet() {
        let code = new_invite_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn slug_normalizes_local_part() {
        assert_eq!(slug_from_email("Avery.Lee+dev@example.com"), "avery-lee-dev");
        assert_eq!(slug_from_email("___@example.com"), "portfolio");
        assert_eq!(slug_from_email("plain@example.com"), "plain");
    }
}
