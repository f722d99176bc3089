use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Threshold used when a budget has no (or a zero) alert percentage.
pub const DEFAULT_ALERT_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Monthly spending limit for one category of a couple.
/// Unique per `(couple_id, category, month, year)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Budget {
    pub id: Uuid,
    pub couple_id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub month: i32,
    pub year: i32,
    pub alert_percent: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BudgetKey {
    pub couple_id: Uuid,
    pub category: String,
    pub month: i32,
    pub year: i32,
}

impl Budget {
    pub fn new(key: BudgetKey, amount: Decimal, alert_percent: Decimal, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            couple_id: key.couple_id,
            category: key.category,
            amount,
            month: key.month,
            year: key.year,
            alert_percent,
            created_at: now,
            updated_at: now,
        }
    }
}
