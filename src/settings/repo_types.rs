use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_THEME: Theme = Theme::System;
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_NOTIFICATIONS: bool = true;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// Per-user preferences, optionally linked to the user's couple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Settings {
    pub id: Uuid,
    pub user_id: Uuid,
    pub couple_id: Option<Uuid>,
    pub theme: Theme,
    pub currency: String,
    pub notifications: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Settings {
    /// Record created on first write for `user_id`.
    pub fn defaults(user_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            couple_id: None,
            theme: DEFAULT_THEME,
            currency: DEFAULT_CURRENCY.to_string(),
            notifications: DEFAULT_NOTIFICATIONS,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Preference values written by an explicit settings update.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub theme: Theme,
    pub currency: String,
    pub notifications: bool,
    /// Overwrites the stored link only when present.
    pub couple_id: Option<Uuid>,
}
