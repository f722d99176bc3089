use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{Scope, StoreResult, Window};
use crate::expenses::repo_types::{CategoryTotal, Expense, ExpenseComment, ExpenseDraft};

/// Access to the `expenses` collection. Every lookup is filtered by [`Scope`].
#[async_trait]
pub trait ExpenseRepo: Send + Sync {
    /// Newest first.
    async fn list_expenses(&self, scope: Scope) -> StoreResult<Vec<Expense>>;

    /// Oldest first, restricted to `created_at` inside the window.
    async fn list_expenses_between(&self, scope: Scope, window: Window)
        -> StoreResult<Vec<Expense>>;

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()>;

    async fn update_expense(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &ExpenseDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Expense>>;

    async fn delete_expense(&self, id: Uuid, scope: Scope) -> StoreResult<bool>;

    /// Appends to the ordered comment list.
    async fn append_comment(
        &self,
        id: Uuid,
        scope: Scope,
        comment: &ExpenseComment,
    ) -> StoreResult<Option<Expense>>;

    /// Sum and count per category, largest total first.
    async fn category_totals(&self, scope: Scope, window: Window)
        -> StoreResult<Vec<CategoryTotal>>;
}
