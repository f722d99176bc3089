use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Couple, Invitation};
use crate::auth::repo_types::User;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub invitee_email: String,
}

/// Body of accept and reject.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentCoupleResponse {
    pub couple: Option<Couple>,
    pub partner: Option<User>,
    pub invitation: Option<Invitation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteResponse {
    pub message: String,
    pub invitation: Invitation,
    pub couple_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptResponse {
    pub message: String,
    pub couple: Couple,
    pub partner: Option<User>,
}
