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

use super::dto::TemplateRequest;
use super::repo_types::ExpenseTemplate;
use super::services;
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppError,
    state::AppState,
};

pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list_templates).post(create_template))
        .route("/templates/:id", put(update_template).delete(delete_template))
}

#[instrument(skip(state))]
pub async fn list_templates(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ExpenseTemplate>>, AppError> {
    Ok(Json(services::list(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_template(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<TemplateRequest>,
) -> Result<(StatusCode, Json<ExpenseTemplate>), AppError> {
    let template =
        services::create(state.store.as_ref(), user_id, &body, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[instrument(skip(state, body))]
pub async fn update_template(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TemplateRequest>,
) -> Result<Json<ExpenseTemplate>, AppError> {
    let template =
        services::update(state.store.as_ref(), user_id, id, &body, OffsetDateTime::now_utc())
            .await?;
    Ok(Json(template))
}

#[instrument(skip(state))]
pub async fn delete_template(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(state.store.as_ref(), user_id, id).await?;
    Ok(Json(MessageResponse::new("Template deleted successfully")))
}
