use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum CoupleStatus {
    Pending,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

/// Pairing of two users. `user2_id` stays empty until an invitation is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Couple {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Option<Uuid>,
    pub status: CoupleStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Couple {
    pub fn pending(inviter: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user1_id: inviter,
            user2_id: None,
            status: CoupleStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn includes(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == Some(user_id)
    }

    /// The other member, if the slot is filled.
    pub fn partner_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user1_id == user_id {
            self.user2_id
        } else if self.user2_id == Some(user_id) {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Invitation {
    pub id: Uuid,
    pub couple_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_email: String,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub status: InvitationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Invitation {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

/// Result of the guarded accept transition.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    Accepted(Couple),
    /// The invitation left `pending` (or expired) before the update landed.
    InvitationNotPending,
    /// The couple is gone or no longer `pending`.
    CoupleNotPending,
    /// One of the two users already has an active couple.
    AlreadyCoupled(Uuid),
}
