use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Profile, User};
use crate::db::StoreResult;

/// Access to the `users` collection.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_external_uid(&self, uid: &str) -> StoreResult<Option<User>>;

    /// `email` must already be normalised.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `StoreError::Conflict` when the e-mail or UID is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Sync name, picture, provider and verified flag from a fresh sign-in.
    async fn update_user_profile(
        &self,
        id: Uuid,
        profile: &Profile,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>>;

    async fn set_payment_handle(
        &self,
        id: Uuid,
        handle: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>>;
}
