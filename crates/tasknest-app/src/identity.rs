//! Identity-provider collaborator and its error vocabulary.

use tasknest_core::{Language, Principal};
use thiserror::Error;
use tokio::sync::watch;

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Known provider error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// Sign-up with an email that already has an account.
    EmailAlreadyInUse,
    /// Password shorter than [`MIN_PASSWORD_LEN`].
    WeakPassword,
    /// Malformed email address.
    InvalidEmail,
    /// No account for the email.
    UserNotFound,
    /// Password mismatch.
    WrongPassword,
    /// Rate limited.
    TooManyRequests,
    /// Interactive sign-in window was dismissed.
    PopupClosedByUser,
    /// Any other provider code, kept verbatim.
    Other(String),
}

impl AuthErrorCode {
    /// Parse a provider code such as `auth/wrong-password`.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.strip_prefix("auth/").unwrap_or(code) {
            "email-already-in-use" => Self::EmailAlreadyInUse,
            "weak-password" => Self::WeakPassword,
            "invalid-email" => Self::InvalidEmail,
            "user-not-found" => Self::UserNotFound,
            "wrong-password" => Self::WrongPassword,
            "too-many-requests" => Self::TooManyRequests,
            "popup-closed-by-user" => Self::PopupClosedByUser,
            _ => Self::Other(code.to_owned()),
        }
    }

    /// Provider code string.
    #[must_use]
    pub fn as_code(&self) -> &str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WeakPassword => "auth/weak-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::Other(code) => code,
        }
    }
}

/// Which account operation produced an [`AuthError`]. Some codes read
/// differently depending on the operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthOperation {
    /// Account creation, sign-in, or sign-out.
    #[default]
    Session,
    /// Password reset request.
    PasswordReset,
}

/// Error reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({})", code.as_code())]
pub struct AuthError {
    /// Provider code.
    pub code: AuthErrorCode,
    /// Raw provider message.
    pub message: String,
    /// Operation that failed.
    pub operation: AuthOperation,
}

impl AuthError {
    /// Build an error for a session operation.
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            operation: AuthOperation::Session,
        }
    }

    /// Tag the error with the operation that produced it.
    #[must_use]
    pub const fn during(mut self, operation: AuthOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Friendly message for known codes; the raw message otherwise.
    #[must_use]
    pub fn describe_user_facing(&self, language: Language) -> String {
        use AuthErrorCode as C;
        let text = match (&self.code, self.operation, language) {
            (C::UserNotFound, AuthOperation::PasswordReset, Language::Fr) => {
                "Aucun compte associé à cette adresse email."
            }
            (C::UserNotFound, AuthOperation::PasswordReset, Language::En) => {
                "No account is associated with this email address."
            }
            (C::EmailAlreadyInUse, _, Language::Fr) => "Cette adresse email est déjà utilisée par un autre compte.",
            (C::EmailAlreadyInUse, _, Language::En) => "This email address is already used by another account.",
            (C::WeakPassword, _, Language::Fr) => "Le mot de passe doit contenir au moins 6 caractères.",
            (C::WeakPassword, _, Language::En) => "The password must contain at least 6 characters.",
            (C::InvalidEmail, _, Language::Fr) => "L'adresse email n'est pas valide.",
            (C::InvalidEmail, _, Language::En) => "The email address is not valid.",
            (C::UserNotFound | C::WrongPassword, _, Language::Fr) => "Email ou mot de passe incorrect.",
            (C::UserNotFound | C::WrongPassword, _, Language::En) => "Incorrect email or password.",
            (C::TooManyRequests, _, Language::Fr) => {
                "Trop de tentatives de connexion. Veuillez réessayer plus tard."
            }
            (C::TooManyRequests, _, Language::En) => "Too many sign-in attempts. Please try again later.",
            (C::PopupClosedByUser, _, Language::Fr) => {
                "Connexion annulée. La fenêtre de connexion a été fermée."
            }
            (C::PopupClosedByUser, _, Language::En) => "Sign-in cancelled. The sign-in window was closed.",
            (C::Other(_), _, _) => return self.message.clone(),
        };
        text.to_owned()
    }
}

/// Hosted identity provider: credential checks, sessions, password resets.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Currently signed-in principal, if any.
    fn current_principal(&self) -> Option<Principal>;

    /// Subscribe to principal changes. The receiver starts at the current value.
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;

    /// Create an account and sign it in.
    ///
    /// # Errors
    /// Returns the provider error when the account cannot be created.
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, AuthError>;

    /// Sign in with email and password.
    ///
    /// # Errors
    /// Returns the provider error when the credentials are rejected.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// End the current session.
    ///
    /// # Errors
    /// Returns the provider error when sign-out fails.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Start a password reset for `email`.
    ///
    /// # Errors
    /// Returns the provider error when no reset can be sent.
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;
}

impl<I: IdentityProvider> IdentityProvider for &I {
    fn current_principal(&self) -> Option<Principal> {
        (**self).current_principal()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        (**self).subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, AuthError> {
        (**self).sign_up(email, password, display_name).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        (**self).sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        (**self).sign_out().await
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        (**self).reset_password(email).await
    }
}
