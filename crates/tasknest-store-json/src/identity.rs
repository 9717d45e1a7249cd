//! Local identity provider: salted password digests and a persisted session.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tasknest_app::identity::MIN_PASSWORD_LEN;
use tasknest_app::{AuthError, AuthErrorCode, IdentityProvider};
use tasknest_core::{Principal, UserId};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document;
use crate::error::JsonStoreError;
use crate::lock::{DirectoryLock, LockMode};

const ACCOUNTS_FILE: &str = "accounts.json";
const SESSION_FILE: &str = "session.json";
const STORAGE_CODE: &str = "local/storage-failure";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAccount {
    principal: Principal,
    salt: String,
    digest: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    uid: UserId,
}

type Accounts = BTreeMap<String, StoredAccount>;

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn storage_error(err: &JsonStoreError) -> AuthError {
    AuthError::new(AuthErrorCode::Other(STORAGE_CODE.to_owned()), err.to_string())
}

/// [`IdentityProvider`] keeping accounts and the current session in the data directory.
pub struct LocalIdentity {
    root: PathBuf,
    principal: watch::Sender<Option<Principal>>,
}

impl LocalIdentity {
    /// Open the identity documents under `root`, restoring a persisted session.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or a document is corrupt.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, JsonStoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let session: Option<StoredSession> = document::read_optional(&root.join(SESSION_FILE))?;
        let accounts: Accounts = document::read_or_default(&root.join(ACCOUNTS_FILE))?;
        let principal = session.and_then(|session| {
            let found = accounts
                .values()
                .find(|account| account.principal.id == session.uid)
                .map(|account| account.principal.clone());
            if found.is_none() {
                warn!(uid = %session.uid, "Session refers to an unknown account");
            }
            found
        });
        let (sender, _receiver) = watch::channel(principal);
        Ok(Self {
            root,
            principal: sender,
        })
    }

    fn guard(&self) -> Result<DirectoryLock, AuthError> {
        DirectoryLock::acquire(&self.root, LockMode::Exclusive).map_err(|err| storage_error(&err.into()))
    }

    fn accounts_path(&self) -> PathBuf {
        self.root.join(ACCOUNTS_FILE)
    }

    fn session_path(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    fn accounts(&self) -> Result<Accounts, AuthError> {
        document::read_or_default(&self.accounts_path()).map_err(|err| storage_error(&err))
    }

    fn start_session(&self, principal: &Principal) -> Result<(), AuthError> {
        let session = StoredSession {
            uid: principal.id.clone(),
        };
        document::write(&self.session_path(), &session).map_err(|err| storage_error(&err))?;
        self.principal.send_replace(Some(principal.clone()));
        Ok(())
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_principal(&self) -> Option<Principal> {
        self.principal.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.principal.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, AuthError> {
        let key = normalize_email(email);
        if !is_valid_email(&key) {
            return Err(AuthError::new(AuthErrorCode::InvalidEmail, "The email address is badly formatted."));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::new(
                AuthErrorCode::WeakPassword,
                "Password should be at least 6 characters.",
            ));
        }

        let _guard = self.guard()?;
        let mut accounts = self.accounts()?;
        if accounts.contains_key(&key) {
            return Err(AuthError::new(
                AuthErrorCode::EmailAlreadyInUse,
                "The email address is already in use by another account.",
            ));
        }
        let display_name = display_name.trim();
        let principal = Principal {
            id: UserId::generate(),
            email: key.clone(),
            display_name: (!display_name.is_empty()).then(|| display_name.to_owned()),
            photo_url: None,
        };
        let salt = Uuid::new_v4().simple().to_string();
        accounts.insert(
            key,
            StoredAccount {
                principal: principal.clone(),
                digest: digest(&salt, password),
                salt,
                created_at: OffsetDateTime::now_utc(),
            },
        );
        document::write(&self.accounts_path(), &accounts).map_err(|err| storage_error(&err))?;
        self.start_session(&principal)?;
        info!(uid = %principal.id, "Created local account");
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let key = normalize_email(email);
        let _guard = self.guard()?;
        let accounts = self.accounts()?;
        let account = accounts.get(&key).ok_or_else(|| {
            AuthError::new(
                AuthErrorCode::UserNotFound,
                "There is no user record corresponding to this identifier.",
            )
        })?;
        if digest(&account.salt, password) != account.digest {
            return Err(AuthError::new(
                AuthErrorCode::WrongPassword,
                "The password is invalid.",
            ));
        }
        self.start_session(&account.principal)?;
        info!(uid = %account.principal.id, "Signed in locally");
        Ok(account.principal.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let _guard = self.guard()?;
        match fs::remove_file(self.session_path()) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(storage_error(&err.into())),
        }
        self.principal.send_replace(None);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let key = normalize_email(email);
        if !self.accounts()?.contains_key(&key) {
            return Err(AuthError::new(
                AuthErrorCode::UserNotFound,
                "There is no user record corresponding to this identifier.",
            ));
        }
        info!(email = %key, "Password reset requested");
        Ok(())
    }
}
