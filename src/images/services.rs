use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{DeleteOutcome, SearchResult};
use crate::{error::AppError, state::AppState};

/// Runs the search and records the hit under `owner_id`. Nothing is stored
/// when the search fails.
pub async fn generate(
    st: &AppState,
    owner_id: Uuid,
    prompt: &str,
) -> Result<SearchResult, AppError> {
    let hit = st.search.search(prompt).await?;
    let record = st
        .results
        .create(owner_id, &hit.normalized_prompt, &hit.image_url)
        .await?;
    info!(user_id = %owner_id, result_id = %record.id, "search result stored");
    Ok(record)
}

pub async fn history(st: &AppState, owner_id: Uuid) -> Result<Vec<SearchResult>, AppError> {
    Ok(st.results.list_by_owner(owner_id).await?)
}

pub async fn delete(st: &AppState, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
    match st.results.delete(owner_id, id).await? {
        DeleteOutcome::Deleted => {
            info!(user_id = %owner_id, result_id = %id, "search result deleted");
            Ok(())
        }
        DeleteOutcome::NotFound => Err(AppError::NotFound("Image not found".into())),
        DeleteOutcome::NotOwner => {
            warn!(user_id = %owner_id, result_id = %id, "delete of a foreign result");
            Err(AppError::Authorization)
        }
    }
}
