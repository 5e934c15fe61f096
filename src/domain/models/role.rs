use chrono::{DateTime, Utc};

/// Named bundle of permissions. Names are UPPER_SNAKE (`ADMIN`, `MODERATOR`).
#[derive(Clone, Debug)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Permission names carried by this role, sorted
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p == name)
    }
}
