//! Refresh token model - single-use rotated session rows.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored refresh token. The row holds a SHA-256 digest of the token, not
/// the token itself. Rows are deleted on rotation and logout; lookups must
/// also reject rows past `expires_utc` that cleanup has not removed yet.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    /// Token id (matches the refresh JWT's jti claim).
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl RefreshToken {
    /// Create a row for an issued token, keyed by the jti baked into it.
    pub fn new_with_id(token_id: Uuid, user_id: Uuid, token: &str, expiry_days: i64) -> Self {
        let now = Utc::now();
        Self {
            token_id,
            user_id,
            token_hash: Self::hash_token(token),
            expires_utc: now + Duration::days(expiry_days),
            created_utc: now,
        }
    }

    /// SHA-256 digest, hex encoded.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self) -> bool {
        self.expires_utc <= Utc::now()
    }

    /// Constant shape check against a presented token.
    pub fn matches(&self, token: &str) -> bool {
        self.token_hash == Self::hash_token(token)
    }
}
