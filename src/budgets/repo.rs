use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::budgets::repo_types::{Budget, BudgetKey};
use crate::db::StoreResult;

/// Access to the `budgets` collection.
#[async_trait]
pub trait BudgetRepo: Send + Sync {
    async fn list_budgets(&self, couple_id: Uuid, month: i32, year: i32)
        -> StoreResult<Vec<Budget>>;

    async fn find_budget_by_key(&self, key: &BudgetKey) -> StoreResult<Option<Budget>>;

    /// Fails with `StoreError::Conflict` when the key is taken.
    async fn insert_budget(&self, budget: &Budget) -> StoreResult<()>;

    async fn update_budget_limits(
        &self,
        key: &BudgetKey,
        amount: Decimal,
        alert_percent: Decimal,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Budget>>;

    async fn delete_budget(&self, id: Uuid, couple_id: Uuid) -> StoreResult<bool>;
}
