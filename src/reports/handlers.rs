use axum::{
    extract::State,
    routing::get,
    Router,
};
use crate::extract::{Json, Path};
use tracing::instrument;

use super::dto::MonthlyReport;
use super::services::{self, MonthWindow};
use crate::{
    auth::extractors::AuthUser, error::AppError, expenses::repo_types::CategoryTotal,
    state::AppState,
};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/monthly/:year/:month", get(monthly_report))
        .route("/reports/categories/:year/:month", get(category_report))
}

#[instrument(skip(state))]
pub async fn monthly_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<Json<MonthlyReport>, AppError> {
    let month = MonthWindow::new(year, month)?;
    Ok(Json(services::monthly(state.store.as_ref(), user_id, month).await?))
}

#[instrument(skip(state))]
pub async fn category_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<Json<Vec<CategoryTotal>>, AppError> {
    let month = MonthWindow::new(year, month)?;
    Ok(Json(services::categories(state.store.as_ref(), user_id, month).await?))
}
