use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use crate::extract::Json;
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::{AcceptResponse, CurrentCoupleResponse, InviteRequest, InviteResponse, TokenRequest};
use super::services;
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppError,
    state::AppState,
};

pub fn couple_routes() -> Router<AppState> {
    Router::new()
        .route("/couples", get(get_current_couple))
        .route("/couples/invite", post(invite_partner))
        .route("/couples/accept", post(accept_invitation))
        .route("/couples/reject", post(reject_invitation))
        .route("/couples/disconnect", post(disconnect_couple))
}

#[instrument(skip(state))]
pub async fn get_current_couple(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CurrentCoupleResponse>, AppError> {
    let view = services::current(state.store.as_ref(), user_id).await?;
    let message = view.couple.is_none().then(|| "No active couple found".to_string());
    Ok(Json(CurrentCoupleResponse {
        couple: view.couple,
        partner: view.partner,
        invitation: view.invitation,
        message,
    }))
}

#[instrument(skip(state, body))]
pub async fn invite_partner(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>), AppError> {
    let (couple, invitation) = services::invite(
        state.store.as_ref(),
        user_id,
        &body.invitee_email,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            message: "Invitation sent successfully".into(),
            invitation,
            couple_id: couple.id,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn accept_invitation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<TokenRequest>,
) -> Result<Json<AcceptResponse>, AppError> {
    let (couple, partner) = services::accept(
        state.store.as_ref(),
        user_id,
        &body.token,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(AcceptResponse {
        message: "Invitation accepted successfully".into(),
        couple,
        partner,
    }))
}

#[instrument(skip(state, body))]
pub async fn reject_invitation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<TokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::reject(
        state.store.as_ref(),
        user_id,
        &body.token,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(MessageResponse::new("Invitation rejected")))
}

#[instrument(skip(state))]
pub async fn disconnect_couple(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    services::disconnect(state.store.as_ref(), user_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse::new("Disconnected from couple successfully")))
}
