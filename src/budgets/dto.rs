use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo_types::Budget;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BudgetRequest {
    pub category: String,
    pub amount: Decimal,
    pub month: u8,
    pub year: i32,
    /// Zero or absent means the default threshold.
    #[serde(default)]
    pub alert_percent: Option<Decimal>,
}

/// `?month=&year=`; unparsable or out-of-range values fall back to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetPeriodQuery {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

/// A budget with its spending for the month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub percent_used: Decimal,
    pub alert_reached: bool,
}
