use chrono::{DateTime, Utc};

/// Fine-grained capability (`USER_DELETE`, `DASHBOARD_VIEW`),
/// grouped into a category for the admin UI.
#[derive(Clone, Debug)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
