use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity - a user-authored text entry, optionally assigned to a
/// group and illustrated by an image URL.
///
/// `published_at` is set once at creation and never changes; edits touch
/// only `text`, `group_id` and `image_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post stamped with the current time.
    pub fn new(
        author_id: Uuid,
        text: String,
        group_id: Option<Uuid>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            text,
            group_id,
            image_url,
            published_at: Utc::now(),
        }
    }
}
