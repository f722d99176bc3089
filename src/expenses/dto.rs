use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo_types::{PartyTag, SplitType};

/// Amounts and split as sent by clients; see `services::validate_split`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SplitInput {
    pub total_amount: Decimal,
    pub paid_by: PartyTag,
    pub split_type: SplitType,
    #[serde(default)]
    pub person1_share: Option<Decimal>,
    #[serde(default)]
    pub person2_share: Option<Decimal>,
}

/// Body of create and update.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExpenseRequest {
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub split: SplitInput,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}
