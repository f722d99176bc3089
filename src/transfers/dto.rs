use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::expenses::repo_types::PartyTag;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferRequest {
    pub amount: Decimal,
    pub from_user: PartyTag,
    pub to_user: PartyTag,
    #[serde(default)]
    pub description: String,
}
