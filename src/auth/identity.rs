//! Seam for checking an external identity-provider assertion.
use async_trait::async_trait;
use tracing::warn;

use super::repo_types::Profile;
use super::services::is_valid_email;
use crate::error::AppError;

/// Checks that an assertion really comes from the identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, profile: &Profile) -> Result<(), AppError>;
}

/// Accepts any well-formed assertion. Signatures are NOT checked; swap in a
/// provider-backed verifier before exposing the service publicly.
#[derive(Debug, Default, Clone)]
pub struct AssertionPassthrough;

#[async_trait]
impl IdentityVerifier for AssertionPassthrough {
    async fn verify(&self, profile: &Profile) -> Result<(), AppError> {
        if profile.external_uid.trim().is_empty() {
            return Err(AppError::invalid("firebase_uid is required"));
        }
        if !is_valid_email(&profile.email) {
            return Err(AppError::invalid("Invalid email"));
        }
        warn!(uid = %profile.external_uid, "identity assertion accepted without signature verification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(uid: &str, email: &str) -> Profile {
        Profile {
            external_uid: uid.into(),
            email: email.into(),
            name: "Ann".into(),
            auth_provider: "google".into(),
            email_verified: true,
            profile_picture: None,
        }
    }

    #[tokio::test]
    async fn passthrough_requires_uid_and_email() {
        let v = AssertionPassthrough;
        assert!(v.verify(&profile("uid-1", "ann@example.com")).await.is_ok());
        assert!(v.verify(&profile(" ", "ann@example.com")).await.is_err());
        assert!(v.verify(&profile("uid-1", "not-an-email")).await.is_err());
    }
}
