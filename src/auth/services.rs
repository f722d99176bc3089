use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::identity::IdentityVerifier;
use super::repo_types::{Profile, User};
use crate::couples::repo_types::Couple;
use crate::couples::services::try_auto_accept;
use crate::db::Store;
use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref UPI_RE: Regex = Regex::new(r"^[a-zA-Z0-9._-]{2,256}@[a-zA-Z][a-zA-Z0-9]{1,63}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `name@provider` payment handle.
pub(crate) fn is_valid_upi(handle: &str) -> bool {
    UPI_RE.is_match(handle)
}

/// Outcome of a sign-in; the session token is issued by the caller.
#[derive(Debug)]
pub struct SignIn {
    pub user: User,
    pub auto_accepted_couple: Option<Couple>,
}

/// Verifies the assertion, creates or refreshes the local user and, when an
/// invitation token came along, tries to accept it on the user's behalf.
pub async fn sign_in(
    store: &dyn Store,
    verifier: &dyn IdentityVerifier,
    mut profile: Profile,
    invitation_token: Option<&str>,
    now: OffsetDateTime,
) -> Result<SignIn, AppError> {
    profile.email = normalize_email(&profile.email);
    profile.external_uid = profile.external_uid.trim().to_string();
    if profile.auth_provider.trim().is_empty() {
        profile.auth_provider = "firebase".into();
    }
    verifier.verify(&profile).await?;

    let user = match store.find_user_by_external_uid(&profile.external_uid).await? {
        Some(existing) => store
            .update_user_profile(existing.id, &profile, now)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?,
        None => {
            if store.find_user_by_email(&profile.email).await?.is_some() {
                warn!(email = %profile.email, "email already bound to another identity");
                return Err(AppError::conflict("User already exists"));
            }
            let user = User::from_profile(profile, now);
            store.insert_user(&user).await?;
            info!(user_id = %user.id, "user created");
            user
        }
    };

    let auto_accepted_couple = match invitation_token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => try_auto_accept(store, &user, token, now).await,
        None => None,
    };

    Ok(SignIn {
        user,
        auto_accepted_couple,
    })
}

pub async fn current_user(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn update_upi(
    store: &dyn Store,
    user_id: Uuid,
    raw: &str,
    now: OffsetDateTime,
) -> Result<User, AppError> {
    let handle = raw.trim();
    if !is_valid_upi(handle) {
        return Err(AppError::invalid("Invalid UPI ID format"));
    }
    store
        .set_payment_handle(user_id, handle, now)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::AssertionPassthrough;
    use crate::couples::repo_types::CoupleStatus;
    use crate::couples::services::invite;
    use crate::db::MemoryStore;

    fn profile(uid: &str, email: &str) -> Profile {
        Profile {
            external_uid: uid.into(),
            email: email.into(),
            name: "Someone".into(),
            auth_provider: "google".into(),
            email_verified: true,
            profile_picture: None,
        }
    }

    #[test]
    fn email_and_upi_formats() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(is_valid_upi("ann.smith@okbank"));
        assert!(!is_valid_upi("ann smith@okbank"));
        assert!(!is_valid_upi("ann"));
    }

    #[tokio::test]
    async fn first_sign_in_creates_then_updates() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let first = sign_in(&store, &AssertionPassthrough, profile("uid-1", " Ann@Example.com "), None, now)
            .await
            .unwrap();
        assert_eq!(first.user.email, "ann@example.com");

        let mut renamed = profile("uid-1", "ann@example.com");
        renamed.name = "Ann B".into();
        let second = sign_in(&store, &AssertionPassthrough, renamed, None, now).await.unwrap();
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.user.name, "Ann B");
    }

    #[tokio::test]
    async fn email_taken_by_other_identity_conflicts() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        sign_in(&store, &AssertionPassthrough, profile("uid-1", "ann@example.com"), None, now)
            .await
            .unwrap();
        let err = sign_in(&store, &AssertionPassthrough, profile("uid-2", "ann@example.com"), None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn sign_in_with_invitation_pairs_users() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let ann = sign_in(&store, &AssertionPassthrough, profile("uid-a", "ann@example.com"), None, now)
            .await
            .unwrap()
            .user;
        sign_in(&store, &AssertionPassthrough, profile("uid-b", "bob@example.com"), None, now)
            .await
            .unwrap();
        let (_, invitation) = invite(&store, ann.id, "bob@example.com", now).await.unwrap();

        let bob = sign_in(
            &store,
            &AssertionPassthrough,
            profile("uid-b", "bob@example.com"),
            Some(&invitation.token),
            now,
        )
        .await
        .unwrap();
        let couple = bob.auto_accepted_couple.expect("auto accepted");
        assert_eq!(couple.status, CoupleStatus::Active);
        assert_eq!(couple.user2_id, Some(bob.user.id));
    }

    #[tokio::test]
    async fn unknown_invitation_is_ignored_on_sign_in() {
        let store = MemoryStore::new();
        let res = sign_in(
            &store,
            &AssertionPassthrough,
            profile("uid-1", "ann@example.com"),
            Some("deadbeef"),
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();
        assert!(res.auto_accepted_couple.is_none());
    }

    #[tokio::test]
    async fn upi_is_validated() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let user = sign_in(&store, &AssertionPassthrough, profile("uid-1", "ann@example.com"), None, now)
            .await
            .unwrap()
            .user;
        assert!(matches!(
            update_upi(&store, user.id, "nope", now).await,
            Err(AppError::InvalidInput(_))
        ));
        let updated = update_upi(&store, user.id, " ann@okaxis ", now).await.unwrap();
        assert_eq!(updated.payment_handle.as_deref(), Some("ann@okaxis"));
    }
}
