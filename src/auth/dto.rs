use serde::{Deserialize, Serialize};

use super::repo_types::User;
use crate::couples::repo_types::Couple;

/// Request body for `POST /auth/verify`: an identity-provider assertion.
#[derive(Debug, Deserialize)]
pub struct VerifyIdentityRequest {
    pub firebase_uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub auth_provider: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// Invitation to accept as part of sign-in.
    #[serde(default)]
    pub invitation_token: Option<String>,
}

/// Response returned after a successful sign-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub auto_accepted_couple: Option<Couple>,
}

/// Request body for `PUT /auth/upi`.
#[derive(Debug, Deserialize)]
pub struct UpdateUpiRequest {
    pub upi_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
