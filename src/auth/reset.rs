use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Reset tokens are valid for ten minutes and single-use
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// A freshly minted credential-reset token. The plaintext goes out by mail;
/// only the hash and expiry are persisted.
#[derive(Debug)]
pub struct ResetToken {
    pub plaintext: String,
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate() -> ResetToken {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let hashed = hash_token(&plaintext);

    ResetToken {
        plaintext,
        hashed,
        expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    }
}

/// Hash a presented token for lookup against the stored hash
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_matches_presented_token() {
        let token = generate();
        assert_ne!(token.plaintext, token.hashed);
        assert_eq!(hash_token(&token.plaintext), token.hashed);
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate().plaintext, generate().plaintext);
    }

    #[test]
    fn expiry_is_ten_minutes_out() {
        let token = generate();
        let delta = token.expires_at - Utc::now();
        assert!(delta <= Duration::minutes(10));
        assert!(delta > Duration::minutes(9));
    }
}
