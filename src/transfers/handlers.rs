use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use crate::extract::{Json, Path};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::dto::TransferRequest;
use super::repo_types::Transfer;
use super::services;
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppError,
    state::AppState,
};

pub fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route("/transfers/:id", put(update_transfer).delete(delete_transfer))
}

#[instrument(skip(state))]
pub async fn list_transfers(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Transfer>>, AppError> {
    Ok(Json(services::list(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_transfer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<TransferRequest>,
) -> Result<(StatusCode, Json<Transfer>), AppError> {
    let transfer =
        services::create(state.store.as_ref(), user_id, &body, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

#[instrument(skip(state, body))]
pub async fn update_transfer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<Transfer>, AppError> {
    let transfer =
        services::update(state.store.as_ref(), user_id, id, &body, OffsetDateTime::now_utc())
            .await?;
    Ok(Json(transfer))
}

#[instrument(skip(state))]
pub async fn delete_transfer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(state.store.as_ref(), user_id, id).await?;
    Ok(Json(MessageResponse::new("Transfer deleted successfully")))
}
