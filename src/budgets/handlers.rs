use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use crate::extract::{Json, Path, Query};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{BudgetPeriodQuery, BudgetRequest, BudgetStatus};
use super::repo_types::Budget;
use super::services;
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppError,
    state::AppState,
};

pub fn budget_routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_budgets).post(save_budget))
        .route("/budgets/:id", put(update_budget).delete(delete_budget))
}

#[instrument(skip(state))]
pub async fn list_budgets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<BudgetPeriodQuery>,
) -> Result<Json<Vec<BudgetStatus>>, AppError> {
    let month = services::period(&q, OffsetDateTime::now_utc());
    Ok(Json(services::list(state.store.as_ref(), user_id, month).await?))
}

#[instrument(skip(state, body))]
pub async fn save_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<BudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), AppError> {
    let (budget, created) =
        services::upsert(state.store.as_ref(), user_id, &body, OffsetDateTime::now_utc()).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(budget)))
}

/// Same upsert as `POST /budgets`; the key comes from the body.
#[instrument(skip(state, body))]
pub async fn update_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(_id): Path<Uuid>,
    Json(body): Json<BudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), AppError> {
    save_budget(State(state), AuthUser(user_id), Json(body)).await
}

#[instrument(skip(state))]
pub async fn delete_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(state.store.as_ref(), user_id, id).await?;
    Ok(Json(MessageResponse::new("Budget deleted successfully")))
}
