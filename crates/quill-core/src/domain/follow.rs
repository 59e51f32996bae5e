use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Follow entity - a directed subscription edge from `user_id` (the
/// follower) to `author_id` (the followed author).
///
/// The edge is unique per (user, author) pair and a user may not follow
/// themselves; both constraints are enforced at the repository layer and
/// by the database schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(user_id: Uuid, author_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            author_id,
            created_at: Utc::now(),
        }
    }
}
