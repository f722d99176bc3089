use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::Balance;
use crate::expenses::repo_types::Expense;
use crate::transfers::repo_types::Transfer;

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub total_spent: Decimal,
    pub person1_paid: Decimal,
    pub person2_paid: Decimal,
    pub category_totals: BTreeMap<String, Decimal>,
    pub expenses: Vec<Expense>,
    pub transfers: Vec<Transfer>,
    pub balance: Balance,
}
