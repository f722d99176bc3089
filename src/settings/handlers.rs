use axum::{extract::State, routing::get, Router};
use crate::extract::Json;
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::SettingsRequest;
use super::repo_types::Settings;
use super::services;
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(
        services::get(state.store.as_ref(), user_id, OffsetDateTime::now_utc()).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SettingsRequest>,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(
        services::update(state.store.as_ref(), user_id, &body, OffsetDateTime::now_utc()).await?,
    ))
}
