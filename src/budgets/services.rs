use std::collections::HashMap;

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::{BudgetPeriodQuery, BudgetRequest, BudgetStatus};
use super::repo_types::{Budget, BudgetKey, DEFAULT_ALERT_PERCENT};
use crate::couples::services::active_couple_id;
use crate::db::{Scope, Store, StoreError};
use crate::error::AppError;
use crate::expenses::services::{check_money, required_text};
use crate::reports::services::MonthWindow;

/// Spending against a budget. `percent_used` is 0 for a zero budget; the
/// alert compares the unrounded percentage.
pub fn evaluate(budget: Budget, spent: Decimal) -> BudgetStatus {
    let percent = if budget.amount.is_zero() {
        Decimal::ZERO
    } else {
        spent / budget.amount * Decimal::ONE_HUNDRED
    };
    let threshold = if budget.alert_percent.is_zero() {
        DEFAULT_ALERT_PERCENT
    } else {
        budget.alert_percent
    };
    BudgetStatus {
        remaining: budget.amount - spent,
        percent_used: percent.round_dp(2),
        alert_reached: percent >= threshold,
        spent,
        budget,
    }
}

/// Month selected by the query, defaulting field by field to `now`.
pub fn period(query: &BudgetPeriodQuery, now: OffsetDateTime) -> MonthWindow {
    let current = MonthWindow::containing(now);
    let month = query
        .month
        .as_deref()
        .and_then(|m| m.trim().parse::<u8>().ok())
        .filter(|m| (1..=12).contains(m));
    let year = query
        .year
        .as_deref()
        .and_then(|y| y.trim().parse::<i32>().ok())
        .filter(|y| *y > 0);
    MonthWindow::new(
        year.unwrap_or(current.year),
        month.unwrap_or(current.month as u8),
    )
    .unwrap_or(current)
}

pub async fn list(
    store: &dyn Store,
    user_id: Uuid,
    month: MonthWindow,
) -> Result<Vec<BudgetStatus>, AppError> {
    let Some(couple_id) = active_couple_id(store, user_id).await? else {
        return Ok(Vec::new());
    };
    let budgets = store
        .list_budgets(couple_id, month.month as i32, month.year)
        .await?;
    if budgets.is_empty() {
        return Ok(Vec::new());
    }
    let spending: HashMap<String, Decimal> = store
        .category_totals(Scope::couple(couple_id), month.window())
        .await?
        .into_iter()
        .map(|row| (row.category, row.total))
        .collect();

    Ok(budgets
        .into_iter()
        .map(|b| {
            let spent = spending.get(&b.category).copied().unwrap_or_default();
            evaluate(b, spent)
        })
        .collect())
}

fn validate(req: &BudgetRequest) -> Result<(String, Decimal, Decimal, MonthWindow), AppError> {
    let category = required_text(&req.category, "category")?;
    let amount = check_money(req.amount, "amount")?;
    if amount < Decimal::ZERO {
        return Err(AppError::invalid("amount must not be negative"));
    }
    let alert = req.alert_percent.unwrap_or_default();
    if alert < Decimal::ZERO || alert > Decimal::ONE_HUNDRED {
        return Err(AppError::invalid("alert_percent must be between 0 and 100"));
    }
    let alert = if alert.is_zero() { DEFAULT_ALERT_PERCENT } else { alert };
    let month = MonthWindow::new(req.year, req.month)?;
    Ok((category, amount, alert, month))
}

/// Creates or updates the budget for (couple, category, month, year).
/// Returns the budget and whether it was created.
pub async fn upsert(
    store: &dyn Store,
    user_id: Uuid,
    req: &BudgetRequest,
    now: OffsetDateTime,
) -> Result<(Budget, bool), AppError> {
    let (category, amount, alert, month) = validate(req)?;
    let couple_id = active_couple_id(store, user_id)
        .await?
        .ok_or_else(|| AppError::invalid("You must be in a couple to set budgets"))?;
    let key = BudgetKey {
        couple_id,
        category,
        month: month.month as i32,
        year: month.year,
    };

    if store.find_budget_by_key(&key).await?.is_none() {
        let budget = Budget::new(key.clone(), amount, alert, now);
        match store.insert_budget(&budget).await {
            Ok(()) => {
                info!(budget_id = %budget.id, %couple_id, "budget created");
                return Ok((budget, true));
            }
            // Lost a race with a concurrent create: update instead.
            Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let budget = store
        .update_budget_limits(&key, amount, alert, now)
        .await?
        .ok_or_else(|| AppError::not_found("Budget not found"))?;
    info!(budget_id = %budget.id, %couple_id, "budget updated");
    Ok((budget, false))
}

pub async fn delete(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let couple_id = active_couple_id(store, user_id)
        .await?
        .ok_or_else(|| AppError::invalid("You must be in a couple"))?;
    if !store.delete_budget(id, couple_id).await? {
        return Err(AppError::not_found("Budget not found"));
    }
    info!(budget_id = %id, %couple_id, "budget deleted");
    Ok(())
}
