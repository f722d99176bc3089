use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{Scope, StoreResult};
use crate::templates::repo_types::{ExpenseTemplate, TemplateDraft};

/// Access to the `expense_templates` collection.
#[async_trait]
pub trait TemplateRepo: Send + Sync {
    async fn list_templates(&self, scope: Scope) -> StoreResult<Vec<ExpenseTemplate>>;

    async fn insert_template(&self, template: &ExpenseTemplate) -> StoreResult<()>;

    async fn update_template(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &TemplateDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<ExpenseTemplate>>;

    async fn delete_template(&self, id: Uuid, scope: Scope) -> StoreResult<bool>;
}
