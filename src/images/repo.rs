use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{DeleteOutcome, SearchResult};

/// Per-user search history. Every operation is scoped by owner id.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create(
        &self,
        owner_id: Uuid,
        prompt: &str,
        image_url: &str,
    ) -> anyhow::Result<SearchResult>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<SearchResult>>;

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<DeleteOutcome>;
}

#[derive(Clone)]
pub struct PgResultStore {
    db: PgPool,
}

impl PgResultStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn create(
        &self,
        owner_id: Uuid,
        prompt: &str,
        image_url: &str,
    ) -> anyhow::Result<SearchResult> {
        let row = sqlx::query_as::<_, SearchResult>(
            r#"
            INSERT INTO search_results (id, user_id, prompt, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, prompt, image_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(prompt)
        .bind(image_url)
        .fetch_one(&self.db)
        .await
        .context("insert search result")?;
        Ok(row)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<SearchResult>> {
        let rows = sqlx::query_as::<_, SearchResult>(
            r#"
            SELECT id, user_id, prompt, image_url, created_at
            FROM search_results
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list search results")?;
        Ok(rows)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<DeleteOutcome> {
        // The owner check and the removal are one statement, so two racing
        // deletes cannot both see the row.
        let deleted = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM search_results
            WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
        .context("delete search result")?;

        if deleted.is_some() {
            return Ok(DeleteOutcome::Deleted);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM search_results WHERE id = $1)"#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .context("check search result exists")?;

        Ok(if exists {
            DeleteOutcome::NotOwner
        } else {
            DeleteOutcome::NotFound
        })
    }
}
