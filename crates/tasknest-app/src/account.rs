//! Account flows that pair the identity provider with profile documents.

use tasknest_core::{Principal, UserProfile};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{AuthOperation, IdentityProvider};
use crate::store::RecordStore;

/// Registration, sign-in, sign-out, and password reset.
pub struct AccountService<I, S> {
    identity: I,
    store: S,
}

impl<I: IdentityProvider, S: RecordStore> AccountService<I, S> {
    /// Pair an identity provider with the store that holds profile documents.
    pub const fn new(identity: I, store: S) -> Self {
        Self { identity, store }
    }

    /// Create an account and its profile with default preferences.
    ///
    /// # Errors
    /// Returns the provider error, or the store error when the profile cannot be written.
    pub async fn register(&self, email: &str, password: &str, display_name: &str) -> AppResult<UserProfile> {
        let principal = self.identity.sign_up(email, password, display_name).await?;
        let profile = UserProfile::for_principal(&principal, OffsetDateTime::now_utc());
        self.store.save_profile(&profile).await.map_err(AppError::store)?;
        info!(uid = %principal.id, "Registered account");
        Ok(profile)
    }

    /// Sign in, refreshing `last_login` or creating the profile when it is missing.
    ///
    /// # Errors
    /// Returns the provider error, or the store error when the profile cannot be written.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserProfile> {
        let principal = self.identity.sign_in(email, password).await?;
        self.touch_profile(&principal).await
    }

    /// End the current session.
    ///
    /// # Errors
    /// Returns the provider error.
    pub async fn logout(&self) -> AppResult<()> {
        self.identity.sign_out().await?;
        Ok(())
    }

    /// Request a password reset email.
    ///
    /// # Errors
    /// Returns the provider error tagged as a reset failure.
    pub async fn reset_password(&self, email: &str) -> AppResult<()> {
        self.identity
            .reset_password(email)
            .await
            .map_err(|err| AppError::Auth(err.during(AuthOperation::PasswordReset)))
    }

    /// Profile of the signed-in principal, if any. Read failures count as "no profile".
    pub async fn current_profile(&self) -> Option<UserProfile> {
        let principal = self.identity.current_principal()?;
        match self.store.load_profile(&principal.id).await {
            Ok(profile) => profile,
            Err(err) => {
                let err: anyhow::Error = err.into();
                warn!(uid = %principal.id, error = %err, "Failed to load profile");
                None
            }
        }
    }

    async fn touch_profile(&self, principal: &Principal) -> AppResult<UserProfile> {
        let now = OffsetDateTime::now_utc();
        let existing = self
            .store
            .load_profile(&principal.id)
            .await
            .map_err(AppError::store)?;
        let profile = match existing {
            Some(mut profile) => {
                profile.last_login = now;
                profile
            }
            None => UserProfile::for_principal(principal, now),
        };
        self.store.save_profile(&profile).await.map_err(AppError::store)?;
        info!(uid = %principal.id, "Signed in");
        Ok(profile)
    }
}
