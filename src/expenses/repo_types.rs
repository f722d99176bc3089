use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Which side of the couple an entry refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PartyTag {
    Person1,
    Person2,
}

impl PartyTag {
    pub fn other(self) -> Self {
        match self {
            PartyTag::Person1 => PartyTag::Person2,
            PartyTag::Person2 => PartyTag::Person1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Ratio,
    Exact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseComment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated amounts and split of an expense or template.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub total_amount: Decimal,
    pub paid_by: PartyTag,
    pub split_type: SplitType,
    pub person1_share: Decimal,
    pub person2_share: Decimal,
}

/// Editable expense fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub description: String,
    pub category: String,
    pub notes: Option<String>,
    pub split: Split,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub couple_id: Option<Uuid>,
    pub description: String,
    pub total_amount: Decimal,
    pub category: String,
    pub paid_by: PartyTag,
    pub split_type: SplitType,
    pub person1_share: Decimal,
    pub person2_share: Decimal,
    pub notes: Option<String>,
    #[sqlx(json)]
    pub comments: Vec<ExpenseComment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Expense {
    pub fn new(
        user_id: Uuid,
        couple_id: Option<Uuid>,
        draft: ExpenseDraft,
        now: OffsetDateTime,
    ) -> Self {
        let mut expense = Self {
            id: Uuid::new_v4(),
            user_id,
            couple_id,
            description: String::new(),
            total_amount: Decimal::ZERO,
            category: String::new(),
            paid_by: PartyTag::Person1,
            split_type: SplitType::Equal,
            person1_share: Decimal::ZERO,
            person2_share: Decimal::ZERO,
            notes: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        expense.apply(draft, now);
        expense
    }

    pub fn apply(&mut self, draft: ExpenseDraft, now: OffsetDateTime) {
        self.description = draft.description;
        self.category = draft.category;
        self.notes = draft.notes;
        self.total_amount = draft.split.total_amount;
        self.paid_by = draft.split.paid_by;
        self.split_type = draft.split.split_type;
        self.person1_share = draft.split.person1_share;
        self.person2_share = draft.split.person2_share;
        self.updated_at = now;
    }
}

/// One row of the group-by-category aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
    pub count: i64,
}
