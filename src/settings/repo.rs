use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::settings::repo_types::{Preferences, Settings};

/// Access to the `settings` collection (one record per user).
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn find_settings(&self, user_id: Uuid) -> StoreResult<Option<Settings>>;

    /// Insert-or-update keyed by user.
    async fn upsert_settings(
        &self,
        user_id: Uuid,
        prefs: &Preferences,
        now: OffsetDateTime,
    ) -> StoreResult<Settings>;
}
