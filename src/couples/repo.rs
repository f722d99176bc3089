use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::couples::repo_types::{AcceptOutcome, Couple, Invitation};
use crate::db::StoreResult;

/// Access to the `couples` and `invitations` collections.
///
/// The transition methods are atomic: each re-checks its status guard inside
/// the store and reports a lost race instead of partially applying.
#[async_trait]
pub trait CoupleRepo: Send + Sync {
    async fn find_couple(&self, id: Uuid) -> StoreResult<Option<Couple>>;

    /// The couple with `status = active` that has `user_id` in either slot.
    async fn find_active_couple(&self, user_id: Uuid) -> StoreResult<Option<Couple>>;

    /// Most recent `pending` couple created by `user_id`.
    async fn find_pending_couple_by_inviter(&self, user_id: Uuid) -> StoreResult<Option<Couple>>;

    async fn insert_couple(&self, couple: &Couple) -> StoreResult<()>;

    /// Compensating action for a failed invite.
    async fn delete_couple(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    async fn find_invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>>;

    async fn find_pending_invitation_for_couple(
        &self,
        couple_id: Uuid,
    ) -> StoreResult<Option<Invitation>>;

    /// `pending -> expired`. Returns false when the invitation was not pending.
    async fn expire_invitation(&self, id: Uuid, now: OffsetDateTime) -> StoreResult<bool>;

    /// Activates the couple with `user_id` in slot two, marks the invitation
    /// accepted and links both members' settings to the couple.
    async fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<AcceptOutcome>;

    /// `pending -> rejected` plus removal of the pending couple.
    /// Returns false when the invitation was not pending.
    async fn reject_invitation(&self, invitation: &Invitation, now: OffsetDateTime)
        -> StoreResult<bool>;

    /// `active -> inactive` for the user's active couple, if any.
    async fn deactivate_active_couple(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Couple>>;
}
