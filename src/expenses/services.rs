use rust_decimal::{Decimal, RoundingStrategy};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::{CommentRequest, ExpenseRequest, SplitInput};
use super::repo_types::{Expense, ExpenseComment, ExpenseDraft, Split, SplitType};
use crate::couples::services::{active_couple_id, ledger_scope};
use crate::db::Store;
use crate::error::AppError;

/// Money is kept to the cent.
pub const MONEY_SCALE: u32 = 2;

pub(crate) fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn check_money(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(AppError::invalid(format!(
            "{field} must have at most {MONEY_SCALE} decimal places"
        )));
    }
    Ok(value)
}

/// Checks a split and fills the shares of an `equal` split left blank.
/// The two shares always add up to the total.
pub fn validate_split(input: &SplitInput) -> Result<Split, AppError> {
    let total = check_money(input.total_amount, "total_amount")?;
    if total <= Decimal::ZERO {
        return Err(AppError::invalid("total_amount must be greater than 0"));
    }

    let blank = |s: Option<Decimal>| s.map_or(true, |v| v.is_zero());
    let (person1_share, person2_share) = match (input.split_type, input.person1_share, input.person2_share) {
        (SplitType::Equal, p1, p2) if blank(p1) && blank(p2) => {
            let half = (total / Decimal::TWO)
                .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
            (half, total - half)
        }
        (_, Some(p1), Some(p2)) => (
            check_money(p1, "person1_share")?,
            check_money(p2, "person2_share")?,
        ),
        _ => {
            return Err(AppError::invalid(
                "person1_share and person2_share are required for this split type",
            ))
        }
    };

    if person1_share < Decimal::ZERO || person2_share < Decimal::ZERO {
        return Err(AppError::invalid("shares must not be negative"));
    }
    if person1_share + person2_share != total {
        return Err(AppError::invalid(
            "person1_share and person2_share must add up to total_amount",
        ));
    }

    Ok(Split {
        total_amount: total,
        paid_by: input.paid_by,
        split_type: input.split_type,
        person1_share,
        person2_share,
    })
}

fn draft(req: &ExpenseRequest) -> Result<ExpenseDraft, AppError> {
    Ok(ExpenseDraft {
        description: required_text(&req.description, "description")?,
        category: required_text(&req.category, "category")?,
        notes: req
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from),
        split: validate_split(&req.split)?,
    })
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> Result<Vec<Expense>, AppError> {
    let scope = ledger_scope(store, user_id).await?;
    Ok(store.list_expenses(scope).await?)
}

pub async fn create(
    store: &dyn Store,
    user_id: Uuid,
    req: &ExpenseRequest,
    now: OffsetDateTime,
) -> Result<Expense, AppError> {
    let draft = draft(req)?;
    let couple_id = active_couple_id(store, user_id).await?;
    let expense = Expense::new(user_id, couple_id, draft, now);
    store.insert_expense(&expense).await?;
    info!(expense_id = %expense.id, %user_id, "expense created");
    Ok(expense)
}

pub async fn update(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
    req: &ExpenseRequest,
    now: OffsetDateTime,
) -> Result<Expense, AppError> {
    let draft = draft(req)?;
    let scope = ledger_scope(store, user_id).await?;
    store
        .update_expense(id, scope, &draft, now)
        .await?
        .ok_or_else(|| AppError::not_found("Expense not found"))
}

pub async fn delete(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let scope = ledger_scope(store, user_id).await?;
    if !store.delete_expense(id, scope).await? {
        return Err(AppError::not_found("Expense not found"));
    }
    info!(expense_id = %id, %user_id, "expense deleted");
    Ok(())
}

pub async fn add_comment(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
    req: &CommentRequest,
    now: OffsetDateTime,
) -> Result<Expense, AppError> {
    let comment = ExpenseComment {
        id: Uuid::new_v4(),
        user_id,
        text: required_text(&req.text, "text")?,
        created_at: now,
    };
    let scope = ledger_scope(store, user_id).await?;
    store
        .append_comment(id, scope, &comment)
        .await?
        .ok_or_else(|| AppError::not_found("Expense not found"))
}
