use chrono::{DateTime, Utc};

/// User account
#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Primary role name mirrored onto the row for quick checks.
    /// The authoritative set lives in the role assignments.
    pub role: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Fields for creating a user. The password arrives already hashed;
/// services own the hashing.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub enabled: bool,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub enabled: Option<bool>,
}

/// Listing filters for the admin view
#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    /// Matches against username or email (substring)
    pub search: Option<String>,
    /// Primary role name
    pub role: Option<String>,
    pub enabled: Option<bool>,
    /// One of: username, email, created_at, last_login_at
    pub sort_by: Option<String>,
}

/// Dashboard counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub admins: u64,
}
