//! Signed-in principal plus its display preferences, kept in step with the identity provider.

use tasknest_core::{Language, Principal, Priority, Theme, UserId, UserPreferences};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::store::RecordStore;

/// Snapshot shared with every view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Signed-in principal, if any.
    pub principal: Option<Principal>,
    /// Effective preferences.
    pub preferences: UserPreferences,
}

impl SessionContext {
    /// Owner id for task queries.
    ///
    /// # Errors
    /// Returns [`ValidationError::SignedOut`] when nobody is signed in.
    pub fn owner(&self) -> Result<&UserId, ValidationError> {
        self.principal
            .as_ref()
            .map(|principal| &principal.id)
            .ok_or(ValidationError::SignedOut)
    }
}

/// Follows principal changes and persists preference edits to the profile.
pub struct Session<S> {
    store: S,
    principals: watch::Receiver<Option<Principal>>,
    fallback: UserPreferences,
    context: SessionContext,
}

impl<S: RecordStore> Session<S> {
    /// Attach to a principal stream, loading preferences for the current principal.
    ///
    /// `fallback` applies while signed out or when the profile cannot be read.
    pub async fn attach(store: S, mut principals: watch::Receiver<Option<Principal>>, fallback: UserPreferences) -> Self {
        let principal = principals.borrow_and_update().clone();
        let mut session = Self {
            store,
            principals,
            fallback,
            context: SessionContext {
                principal: None,
                preferences: fallback,
            },
        };
        session.load(principal).await;
        session
    }

    /// Current snapshot.
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Reload when the principal changed since the last look. Returns whether it did.
    pub async fn sync(&mut self) -> bool {
        if !self.principals.has_changed().unwrap_or(false) {
            return false;
        }
        let principal = self.principals.borrow_and_update().clone();
        self.load(principal).await;
        true
    }

    /// Wait for the next principal change and reload. Returns `false` once the provider is gone.
    pub async fn changed(&mut self) -> bool {
        if self.principals.changed().await.is_err() {
            return false;
        }
        let principal = self.principals.borrow_and_update().clone();
        self.load(principal).await;
        true
    }

    /// Switch theme.
    pub async fn set_theme(&mut self, theme: Theme) {
        self.context.preferences.theme = theme;
        self.persist().await;
    }

    /// Flip between light and dark.
    pub async fn toggle_theme(&mut self) -> Theme {
        let theme = self.context.preferences.theme.toggled();
        self.set_theme(theme).await;
        theme
    }

    /// Switch interface language.
    pub async fn set_language(&mut self, language: Language) {
        self.context.preferences.language = language;
        self.persist().await;
    }

    /// Show or hide completed tasks.
    pub async fn set_show_completed(&mut self, show: bool) {
        self.context.preferences.show_completed_tasks = show;
        self.persist().await;
    }

    /// Priority preselected for new tasks.
    pub async fn set_default_priority(&mut self, priority: Priority) {
        self.context.preferences.default_priority = priority;
        self.persist().await;
    }

    async fn load(&mut self, principal: Option<Principal>) {
        let preferences = match &principal {
            None => self.fallback,
            Some(principal) => match self.store.load_profile(&principal.id).await {
                Ok(Some(profile)) => profile.preferences,
                Ok(None) => {
                    debug!(uid = %principal.id, "No profile, using default preferences");
                    self.fallback
                }
                Err(err) => {
                    let err: anyhow::Error = err.into();
                    warn!(uid = %principal.id, error = %err, "Failed to load preferences");
                    self.fallback
                }
            },
        };
        self.context = SessionContext { principal, preferences };
    }

    async fn persist(&self) {
        let Some(principal) = &self.context.principal else {
            return;
        };
        if let Err(err) = self
            .store
            .update_preferences(&principal.id, &self.context.preferences)
            .await
        {
            let err: anyhow::Error = err.into();
            warn!(uid = %principal.id, error = %err, "Failed to save preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountService;
    use crate::identity::IdentityProvider;
    use crate::testing::{MemoryStore, MockIdentity};

    #[tokio::test]
    async fn signed_out_session_uses_fallback() {
        let identity = MockIdentity::default();
        let store = MemoryStore::default();
        let fallback = UserPreferences {
            language: Language::En,
            ..UserPreferences::default()
        };
        let session = Session::attach(&store, identity.subscribe(), fallback).await;
        assert_eq!(session.context().preferences, fallback);
        assert!(matches!(session.context().owner(), Err(ValidationError::SignedOut)));
    }

    #[tokio::test]
    async fn sign_in_loads_profile_preferences() -> anyhow::Result<()> {
        let identity = MockIdentity::default();
        let store = MemoryStore::default();
        let mut session = Session::attach(&store, identity.subscribe(), UserPreferences::default()).await;
        assert!(!session.sync().await);

        let accounts = AccountService::new(&identity, &store);
        let mut profile = accounts.register("eve@example.com", "secret1", "Eve").await?;
        profile.preferences.theme = Theme::Dark;
        store.save_profile(&profile).await?;

        assert!(session.sync().await);
        assert_eq!(session.context().owner()?, &profile.uid);
        assert_eq!(session.context().preferences.theme, Theme::Dark);

        accounts.logout().await?;
        assert!(session.sync().await);
        assert!(session.context().principal.is_none());
        assert_eq!(session.context().preferences.theme, Theme::Light);
        Ok(())
    }

    #[tokio::test]
    async fn preference_edits_are_persisted() -> anyhow::Result<()> {
        let identity = MockIdentity::default();
        let store = MemoryStore::default();
        let profile = AccountService::new(&identity, &store)
            .register("fay@example.com", "secret1", "Fay")
            .await?;
        let mut session = Session::attach(&store, identity.subscribe(), UserPreferences::default()).await;

        assert_eq!(session.toggle_theme().await, Theme::Dark);
        session.set_language(Language::En).await;
        session.set_show_completed(false).await;

        let stored = store
            .profile(&profile.uid)
            .unwrap_or_else(|| panic!("profile must exist"))
            .preferences;
        assert_eq!(stored.theme, Theme::Dark);
        assert_eq!(stored.language, Language::En);
        assert!(!stored.show_completed_tasks);
        Ok(())
    }

    #[tokio::test]
    async fn failed_preference_writes_keep_local_state() -> anyhow::Result<()> {
        let identity = MockIdentity::default();
        let store = MemoryStore::default();
        AccountService::new(&identity, &store)
            .register("gil@example.com", "secret1", "Gil")
            .await?;
        let mut session = Session::attach(&store, identity.subscribe(), UserPreferences::default()).await;
        store.fail_profiles();

        session.set_theme(Theme::Dark).await;
        assert_eq!(session.context().preferences.theme, Theme::Dark);
        Ok(())
    }
}
