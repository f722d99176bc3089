use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::expenses::repo_types::{PartyTag, Split, SplitType};

/// Reusable expense skeleton.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ExpenseTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub couple_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub total_amount: Decimal,
    pub category: String,
    pub paid_by: PartyTag,
    pub split_type: SplitType,
    pub person1_share: Decimal,
    pub person2_share: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub split: Split,
}

impl ExpenseTemplate {
    pub fn new(
        user_id: Uuid,
        couple_id: Option<Uuid>,
        draft: TemplateDraft,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            couple_id,
            name: draft.name,
            description: draft.description,
            total_amount: draft.split.total_amount,
            category: draft.category,
            paid_by: draft.split.paid_by,
            split_type: draft.split.split_type,
            person1_share: draft.split.person1_share,
            person2_share: draft.split.person2_share,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: TemplateDraft, now: OffsetDateTime) {
        self.name = draft.name;
        self.description = draft.description;
        self.category = draft.category;
        self.total_amount = draft.split.total_amount;
        self.paid_by = draft.split.paid_by;
        self.split_type = draft.split.split_type;
        self.person1_share = draft.split.person1_share;
        self.person2_share = draft.split.person2_share;
        self.updated_at = now;
    }
}
