use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{DeleteResponse, GenerateRequest, ImageView},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images/generate", post(generate_image))
        .route("/images/history", get(get_history))
        .route("/images/:id", delete(delete_image))
}

#[instrument(skip(state, payload))]
pub async fn generate_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ImageView>), AppError> {
    let Json(payload) = payload?;
    let record = services::generate(&state, user_id, &payload.prompt).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ImageView>>, AppError> {
    let records = services::history(&state, user_id).await?;
    Ok(Json(records.into_iter().map(ImageView::from).collect()))
}

#[instrument(skip(state, id))]
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = id?;
    services::delete(&state, user_id, id).await?;
    Ok(Json(DeleteResponse {
        message: "Image deleted successfully".into(),
    }))
}
