use crate::state::AppState;
use axum::Router;

pub mod balance;
pub mod dto;
pub mod handlers;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::report_routes()
}
