//! Couple and invitation lifecycle.
//!
//! Couple: pending -> active -> inactive. Invitation: pending -> accepted | rejected | expired.
use rand::RngCore;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::repo_types::{AcceptOutcome, Couple, Invitation, InvitationStatus};
use crate::auth::repo_types::User;
use crate::auth::services::{is_valid_email, normalize_email};
use crate::db::{Scope, Store};
use crate::error::AppError;

pub const INVITATION_TTL: Duration = Duration::days(7);

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// What `GET /couples` shows: the active couple, or the caller's own pending one.
#[derive(Debug, Default)]
pub struct CoupleView {
    pub couple: Option<Couple>,
    pub partner: Option<User>,
    pub invitation: Option<Invitation>,
}

pub async fn current(store: &dyn Store, user_id: Uuid) -> Result<CoupleView, AppError> {
    if let Some(couple) = store.find_active_couple(user_id).await? {
        let partner = match couple.partner_of(user_id) {
            Some(id) => store.find_user(id).await?,
            None => None,
        };
        return Ok(CoupleView {
            couple: Some(couple),
            partner,
            invitation: None,
        });
    }
    if let Some(couple) = store.find_pending_couple_by_inviter(user_id).await? {
        let invitation = store.find_pending_invitation_for_couple(couple.id).await?;
        return Ok(CoupleView {
            couple: Some(couple),
            partner: None,
            invitation,
        });
    }
    Ok(CoupleView::default())
}

/// Creates a pending couple and its invitation. The two writes form a saga:
/// when the invitation insert fails the couple is deleted again.
pub async fn invite(
    store: &dyn Store,
    inviter_id: Uuid,
    invitee_email: &str,
    now: OffsetDateTime,
) -> Result<(Couple, Invitation), AppError> {
    let invitee_email = normalize_email(invitee_email);
    if !is_valid_email(&invitee_email) {
        return Err(AppError::invalid("Invalid email"));
    }
    if store.find_active_couple(inviter_id).await?.is_some() {
        return Err(AppError::conflict(
            "You already have an active couple. Please disconnect first.",
        ));
    }
    let invitee = store
        .find_user_by_email(&invitee_email)
        .await?
        .ok_or_else(|| AppError::not_found("User with this email not found"))?;
    if store.find_active_couple(invitee.id).await?.is_some() {
        return Err(AppError::conflict("This user already has an active couple"));
    }
    if invitee.id == inviter_id {
        return Err(AppError::invalid("You cannot invite yourself"));
    }

    let couple = Couple::pending(inviter_id, now);
    store.insert_couple(&couple).await?;

    let invitation = Invitation {
        id: Uuid::new_v4(),
        couple_id: couple.id,
        inviter_id,
        invitee_email,
        token: generate_token(),
        expires_at: now + INVITATION_TTL,
        status: InvitationStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = store.insert_invitation(&invitation).await {
        error!(error = %e, couple_id = %couple.id, "invitation insert failed, rolling back couple");
        if let Err(rollback) = store.delete_couple(couple.id).await {
            error!(error = %rollback, couple_id = %couple.id, "couple rollback failed");
        }
        return Err(AppError::Internal(anyhow::anyhow!("Failed to create invitation: {e}")));
    }

    info!(couple_id = %couple.id, inviter_id = %inviter_id, "invitation created");
    Ok((couple, invitation))
}

/// Loads the invitation and checks it is addressed to `user`.
async fn addressed_invitation(
    store: &dyn Store,
    user: &User,
    token: &str,
) -> Result<Invitation, AppError> {
    let invitation = store
        .find_invitation_by_token(token.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Invitation not found"))?;
    if normalize_email(&user.email) != invitation.invitee_email {
        warn!(user_id = %user.id, invitation_id = %invitation.id, "invitation addressed to someone else");
        return Err(AppError::Forbidden("This invitation is not for you".into()));
    }
    Ok(invitation)
}

async fn load_user(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Activates the invitation's couple with `user_id` in the second slot.
/// Returns the active couple and the partner (the inviter).
pub async fn accept(
    store: &dyn Store,
    user_id: Uuid,
    token: &str,
    now: OffsetDateTime,
) -> Result<(Couple, Option<User>), AppError> {
    let invitation = store
        .find_invitation_by_token(token.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Invitation not found"))?;

    if invitation.is_expired(now) {
        if store.expire_invitation(invitation.id, now).await? {
            info!(invitation_id = %invitation.id, "invitation expired");
        }
        return Err(AppError::Expired("Invitation has expired".into()));
    }
    if invitation.status != InvitationStatus::Pending {
        return Err(AppError::invalid("Invitation is no longer valid"));
    }

    let user = load_user(store, user_id).await?;
    if normalize_email(&user.email) != invitation.invitee_email {
        warn!(%user_id, invitation_id = %invitation.id, "invitation addressed to someone else");
        return Err(AppError::Forbidden("This invitation is not for you".into()));
    }
    if store.find_active_couple(user_id).await?.is_some() {
        return Err(AppError::conflict("You already have an active couple"));
    }

    let couple = match store.accept_invitation(&invitation, user_id, now).await? {
        AcceptOutcome::Accepted(couple) => couple,
        AcceptOutcome::InvitationNotPending => {
            return Err(AppError::invalid("Invitation is no longer valid"))
        }
        AcceptOutcome::CoupleNotPending => {
            return Err(AppError::not_found("Couple not found"))
        }
        AcceptOutcome::AlreadyCoupled(member) if member == user_id => {
            return Err(AppError::conflict("You already have an active couple"))
        }
        AcceptOutcome::AlreadyCoupled(_) => {
            return Err(AppError::conflict("This user already has an active couple"))
        }
    };

    info!(couple_id = %couple.id, %user_id, "invitation accepted");
    let partner = store.find_user(couple.user1_id).await?;
    Ok((couple, partner))
}

/// Rejects a pending invitation and deletes its couple.
pub async fn reject(
    store: &dyn Store,
    user_id: Uuid,
    token: &str,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    let user = load_user(store, user_id).await?;
    let invitation = addressed_invitation(store, &user, token).await?;
    if invitation.status != InvitationStatus::Pending {
        return Err(AppError::invalid("Invitation is no longer valid"));
    }
    if !store.reject_invitation(&invitation, now).await? {
        return Err(AppError::invalid("Invitation is no longer valid"));
    }
    info!(invitation_id = %invitation.id, %user_id, "invitation rejected");
    Ok(())
}

pub async fn disconnect(
    store: &dyn Store,
    user_id: Uuid,
    now: OffsetDateTime,
) -> Result<Couple, AppError> {
    let couple = store
        .deactivate_active_couple(user_id, now)
        .await?
        .ok_or_else(|| AppError::not_found("No active couple found"))?;
    info!(couple_id = %couple.id, %user_id, "couple disconnected");
    Ok(couple)
}

/// Sign-in variant of [`accept`]: every failure is skipped silently.
pub async fn try_auto_accept(
    store: &dyn Store,
    user: &User,
    token: &str,
    now: OffsetDateTime,
) -> Option<Couple> {
    match accept(store, user.id, token, now).await {
        Ok((couple, _)) => {
            info!(couple_id = %couple.id, user_id = %user.id, "invitation auto-accepted on sign-in");
            Some(couple)
        }
        Err(e) => {
            debug!(user_id = %user.id, reason = %e, "auto-accept skipped");
            None
        }
    }
}

/// The active couple id of `user_id`, if any.
pub async fn active_couple_id(store: &dyn Store, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
    Ok(store.find_active_couple(user_id).await?.map(|c| c.id))
}

/// Ledger visibility for `user_id`: own entries plus the active couple's.
pub async fn ledger_scope(store: &dyn Store, user_id: Uuid) -> Result<Scope, AppError> {
    Ok(Scope::for_user(user_id, active_couple_id(store, user_id).await?))
}

/// Rows that make up a report. Inside a couple this is the couple's ledger
/// only, so both partners see the same figures.
pub async fn report_scope(store: &dyn Store, user_id: Uuid) -> Result<Scope, AppError> {
    Ok(match active_couple_id(store, user_id).await? {
        Some(couple_id) => Scope::couple(couple_id),
        None => Scope::for_user(user_id, None),
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::user;
    use super::*;
    use crate::couples::repo_types::CoupleStatus;
    use crate::couples::repo::CoupleRepo;
    use crate::db::MemoryStore;
    use crate::settings::repo::SettingsRepo;

    async fn trio(store: &MemoryStore) -> (User, User, User) {
        (
            user(store, "a@example.com").await,
            user(store, "b@example.com").await,
            user(store, "c@example.com").await,
        )
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let t = generate_token();
        assert_eq!(t.len(), 64);
        assert!(t.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(t, generate_token());
    }

    #[tokio::test]
    async fn invite_then_accept_activates_couple() {
        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();

        let (couple, invitation) = invite(&store, a.id, "B@Example.com", now).await.unwrap();
        assert_eq!(couple.status, CoupleStatus::Pending);
        assert_eq!(invitation.invitee_email, "b@example.com");
        assert_eq!(invitation.expires_at, now + INVITATION_TTL);

        let (active, partner) = accept(&store, b.id, &invitation.token, now).await.unwrap();
        assert_eq!(active.status, CoupleStatus::Active);
        assert_eq!(active.user2_id, Some(b.id));
        assert_eq!(partner.map(|p| p.id), Some(a.id));

        let stored = store.find_invitation_by_token(&invitation.token).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Accepted);

        for member in [a.id, b.id] {
            let settings = store.find_settings(member).await.unwrap().unwrap();
            assert_eq!(settings.couple_id, Some(active.id));
        }
    }

    #[tokio::test]
    async fn accept_links_settings_without_touching_preferences() {
        use crate::settings::{dto::SettingsRequest, repo_types::Theme, services as settings};

        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let saved = SettingsRequest {
            theme: Some("dark".into()),
            currency: Some("eur".into()),
            notifications: Some(false),
        };
        settings::update(&store, b.id, &saved, now).await.unwrap();

        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        let (active, _) = accept(&store, b.id, &invitation.token, now).await.unwrap();

        let kept = store.find_settings(b.id).await.unwrap().unwrap();
        assert_eq!(kept.couple_id, Some(active.id));
        assert_eq!(kept.theme, Theme::Dark);
        assert_eq!(kept.currency, "EUR");
        assert!(!kept.notifications);

        // The inviter had no record, so theirs starts from the defaults.
        let fresh = store.find_settings(a.id).await.unwrap().unwrap();
        assert_eq!(fresh.theme, Theme::System);
        assert_eq!(fresh.currency, "USD");
        assert!(fresh.notifications);
    }

    #[tokio::test]
    async fn report_scope_is_the_couple_once_paired() {
        let store = MemoryStore::new();
        let (a, b, c) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        let (active, _) = accept(&store, b.id, &invitation.token, now).await.unwrap();

        for member in [a.id, b.id] {
            assert_eq!(report_scope(&store, member).await.unwrap(), Scope::couple(active.id));
        }
        assert_eq!(
            report_scope(&store, c.id).await.unwrap(),
            Scope::for_user(c.id, None)
        );
    }

    #[tokio::test]
    async fn accept_by_wrong_user_is_forbidden_and_couple_stays_pending() {
        let store = MemoryStore::new();
        let (a, _, c) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (couple, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();

        let err = accept(&store, c.id, &invitation.token, now).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let stored = store.find_couple(couple.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CoupleStatus::Pending);
    }

    #[tokio::test]
    async fn accept_after_expiry_marks_invitation_expired() {
        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (couple, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();

        let later = now + INVITATION_TTL + Duration::seconds(1);
        let err = accept(&store, b.id, &invitation.token, later).await.unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));

        let stored = store.find_invitation_by_token(&invitation.token).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Expired);
        let couple = store.find_couple(couple.id).await.unwrap().unwrap();
        assert_eq!(couple.status, CoupleStatus::Pending);
    }

    #[tokio::test]
    async fn accepted_invitation_cannot_be_reused() {
        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        accept(&store, b.id, &invitation.token, now).await.unwrap();
        let err = accept(&store, b.id, &invitation.token, now).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reject_marks_invitation_and_deletes_couple() {
        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (couple, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();

        reject(&store, b.id, &invitation.token, now).await.unwrap();
        let stored = store.find_invitation_by_token(&invitation.token).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Rejected);
        assert!(store.find_couple(couple.id).await.unwrap().is_none());

        let err = reject(&store, b.id, &invitation.token, now).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reject_requires_matching_email() {
        let store = MemoryStore::new();
        let (a, _, c) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        let err = reject(&store, c.id, &invitation.token, now).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn invite_guards() {
        let store = MemoryStore::new();
        let (a, b, c) = trio(&store).await;
        let now = OffsetDateTime::now_utc();

        assert!(matches!(
            invite(&store, a.id, "nobody@example.com", now).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            invite(&store, a.id, "a@example.com", now).await,
            Err(AppError::InvalidInput(_))
        ));

        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        accept(&store, b.id, &invitation.token, now).await.unwrap();

        assert!(matches!(
            invite(&store, a.id, "c@example.com", now).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            invite(&store, c.id, "b@example.com", now).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn failed_invitation_insert_rolls_back_couple() {
        let store = MemoryStore::new();
        let (a, _, _) = trio(&store).await;
        store.fail_invitation_inserts();

        let err = invite(&store, a.id, "b@example.com", OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(store.find_pending_couple_by_inviter(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_one_active_couple_per_user() {
        let store = MemoryStore::new();
        let (a, b, c) = trio(&store).await;
        let now = OffsetDateTime::now_utc();

        // Two invitations to the same user, both still pending.
        let (_, first) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        let (_, second) = invite(&store, c.id, "b@example.com", now).await.unwrap();

        accept(&store, b.id, &first.token, now).await.unwrap();
        let err = accept(&store, b.id, &second.token, now).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The store transition itself re-checks, even when the service pre-check is bypassed.
        let outcome = store.accept_invitation(&second, b.id, now).await.unwrap();
        assert_eq!(outcome, AcceptOutcome::AlreadyCoupled(b.id));
    }

    #[tokio::test]
    async fn disconnect_deactivates_and_then_reports_missing() {
        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        accept(&store, b.id, &invitation.token, now).await.unwrap();

        let couple = disconnect(&store, b.id, now).await.unwrap();
        assert_eq!(couple.status, CoupleStatus::Inactive);
        assert!(matches!(
            disconnect(&store, a.id, now).await,
            Err(AppError::NotFound(_))
        ));
        // Both are free to pair again.
        invite(&store, a.id, "b@example.com", now).await.unwrap();
    }

    #[tokio::test]
    async fn current_shows_pending_then_active() {
        let store = MemoryStore::new();
        let (a, b, _) = trio(&store).await;
        let now = OffsetDateTime::now_utc();

        assert!(current(&store, a.id).await.unwrap().couple.is_none());

        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();
        let pending = current(&store, a.id).await.unwrap();
        assert_eq!(pending.invitation.map(|i| i.id), Some(invitation.id));

        accept(&store, b.id, &invitation.token, now).await.unwrap();
        let view = current(&store, a.id).await.unwrap();
        assert_eq!(view.partner.map(|p| p.id), Some(b.id));
        assert!(view.invitation.is_none());
    }

    #[tokio::test]
    async fn auto_accept_skips_silently() {
        let store = MemoryStore::new();
        let (a, b, c) = trio(&store).await;
        let now = OffsetDateTime::now_utc();
        let (_, invitation) = invite(&store, a.id, "b@example.com", now).await.unwrap();

        assert!(try_auto_accept(&store, &b, "missing", now).await.is_none());
        assert!(try_auto_accept(&store, &c, &invitation.token, now).await.is_none());
        let late = now + INVITATION_TTL + Duration::minutes(1);
        assert!(try_auto_accept(&store, &b, &invitation.token, late).await.is_none());
    }
}
