use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    #[serde(rename = "firebase_uid")]
    pub external_uid: String,         // identity-provider UID
    pub email: String,                // lower-cased
    pub name: String,
    pub auth_provider: String,
    pub email_verified: bool,
    pub profile_picture: Option<String>,
    #[serde(rename = "upi_id")]
    pub payment_handle: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Profile fields taken from an identity assertion.
#[derive(Debug, Clone)]
pub struct Profile {
    pub external_uid: String,
    pub email: String,
    pub name: String,
    pub auth_provider: String,
    pub email_verified: bool,
    pub profile_picture: Option<String>,
}

impl User {
    pub fn from_profile(profile: Profile, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_uid: profile.external_uid,
            email: profile.email,
            name: profile.name,
            auth_provider: profile.auth_provider,
            email_verified: profile.email_verified,
            profile_picture: profile.profile_picture,
            payment_handle: None,
            created_at: now,
            updated_at: now,
        }
    }
}
