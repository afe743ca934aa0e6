use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A stored search outcome.
#[derive(Debug, Clone, FromRow)]
pub struct SearchResult {
    pub id: Uuid,
    pub user_id: Uuid, // owner, set once from the session
    pub prompt: String,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

/// What a delete attempt found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}
