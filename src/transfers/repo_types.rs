use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::expenses::repo_types::PartyTag;

/// Money handed from one partner to the other to settle up.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Transfer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub couple_id: Option<Uuid>,
    pub amount: Decimal,
    pub from_user: PartyTag,
    pub to_user: PartyTag,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated editable fields; `from_user != to_user` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferDraft {
    pub amount: Decimal,
    pub from_user: PartyTag,
    pub to_user: PartyTag,
    pub description: String,
}

impl Transfer {
    pub fn new(
        user_id: Uuid,
        couple_id: Option<Uuid>,
        draft: TransferDraft,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            couple_id,
            amount: draft.amount,
            from_user: draft.from_user,
            to_user: draft.to_user,
            description: draft.description,
            created_at: now,
            updated_at: now,
        }
    }
}
