use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use crate::extract::{Json, Path};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CommentRequest, ExpenseRequest};
use super::repo_types::Expense;
use super::services;
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppError,
    state::AppState,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", put(update_expense).delete(delete_expense))
        .route("/expenses/:id/comments", post(add_comment))
}

#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Expense>>, AppError> {
    Ok(Json(services::list(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense =
        services::create(state.store.as_ref(), user_id, &body, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[instrument(skip(state, body))]
pub async fn update_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ExpenseRequest>,
) -> Result<Json<Expense>, AppError> {
    let expense =
        services::update(state.store.as_ref(), user_id, id, &body, OffsetDateTime::now_utc())
            .await?;
    Ok(Json(expense))
}

#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(state.store.as_ref(), user_id, id).await?;
    Ok(Json(MessageResponse::new("Expense deleted successfully")))
}

#[instrument(skip(state, body))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense =
        services::add_comment(state.store.as_ref(), user_id, id, &body, OffsetDateTime::now_utc())
            .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}
