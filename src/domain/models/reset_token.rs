use chrono::{DateTime, Utc};

/// Single-use password reset token with a fixed lifetime
#[derive(Clone, Debug)]
pub struct ResetToken {
    pub id: String,
    /// Opaque token value carried in the reset link
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}
