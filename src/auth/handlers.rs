use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::{get, post, put},
    Router,
};
use crate::extract::Json;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, MessageResponse, UpdateUpiRequest, VerifyIdentityRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::{Profile, User},
        services,
    },
    error::AppError,
    state::AppState,
};

/// Header that carries an invitation to accept during sign-in.
pub const INVITATION_HEADER: &str = "x-invitation-token";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/verify", post(verify_identity))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/upi", put(update_upi))
}

#[instrument(skip(state, headers, payload))]
pub async fn verify_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyIdentityRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invitation_token = headers
        .get(INVITATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(payload.invitation_token);

    let profile = Profile {
        external_uid: payload.firebase_uid,
        email: payload.email,
        name: payload.name,
        auth_provider: payload.auth_provider,
        email_verified: payload.email_verified,
        profile_picture: payload.profile_picture.filter(|p| !p.is_empty()),
    };

    let signed_in = services::sign_in(
        state.store.as_ref(),
        state.verifier.as_ref(),
        profile,
        invitation_token.as_deref(),
        OffsetDateTime::now_utc(),
    )
    .await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(signed_in.user.id)?;

    info!(user_id = %signed_in.user.id, "user signed in");
    Ok(Json(AuthResponse {
        token,
        user: signed_in.user,
        auto_accepted_couple: signed_in.auto_accepted_couple,
    }))
}

/// Sessions are stateless; the client drops its token.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(services::current_user(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_upi(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateUpiRequest>,
) -> Result<Json<User>, AppError> {
    let user = services::update_upi(
        state.store.as_ref(),
        user_id,
        &payload.upi_id,
        OffsetDateTime::now_utc(),
    )
    .await?;
    info!(%user_id, "payment handle updated");
    Ok(Json(user))
}
