use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{Scope, StoreResult, Window};
use crate::transfers::repo_types::{Transfer, TransferDraft};

/// Access to the `transfers` collection.
#[async_trait]
pub trait TransferRepo: Send + Sync {
    async fn list_transfers(&self, scope: Scope) -> StoreResult<Vec<Transfer>>;

    async fn list_transfers_between(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<Transfer>>;

    async fn insert_transfer(&self, transfer: &Transfer) -> StoreResult<()>;

    async fn update_transfer(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &TransferDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Transfer>>;

    async fn delete_transfer(&self, id: Uuid, scope: Scope) -> StoreResult<bool>;
}
