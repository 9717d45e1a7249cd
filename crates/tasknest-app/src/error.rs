//! Error taxonomy shared by the application services.

use tasknest_core::{Language, TaskId};
use thiserror::Error;

use crate::identity::AuthError;
use crate::image::ImageError;
use crate::init::InitError;

/// Input rejected before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field is blank.
    #[error("{field} must not be empty")]
    Empty {
        /// Offending field.
        field: &'static str,
    },
    /// An action requires a signed-in principal.
    #[error("no principal is signed in")]
    SignedOut,
    /// The task is not in the owner's batch.
    #[error("task not found: {id}")]
    UnknownTask {
        /// Requested id.
        id: TaskId,
    },
}

impl ValidationError {
    /// Field the error should be displayed next to, if any.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Empty { field } => Some(field),
            Self::SignedOut | Self::UnknownTask { .. } => None,
        }
    }
}

/// Umbrella error returned by application services.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input validation failed; nothing was sent upstream.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The identity provider refused the request.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Image upload failed validation.
    #[error(transparent)]
    Image(#[from] ImageError),
    /// Initialization could not proceed.
    #[error(transparent)]
    Init(#[from] InitError),
    /// The record store failed.
    #[error("record store error: {0}")]
    Store(anyhow::Error),
}

/// Result alias for application services.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wrap a record-store error.
    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }

    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self, language: Language) -> String {
        match (self, language) {
            (Self::Validation(ValidationError::Empty { field: "title" }), Language::Fr) => {
                "Le titre est requis".to_owned()
            }
            (Self::Validation(ValidationError::Empty { field: "title" }), Language::En) => {
                "Title is required".to_owned()
            }
            (Self::Validation(ValidationError::SignedOut), Language::Fr) => {
                "Vous devez être connecté pour effectuer cette action".to_owned()
            }
            (Self::Validation(ValidationError::SignedOut), Language::En) => {
                "You must be signed in to do this".to_owned()
            }
            (Self::Validation(ValidationError::UnknownTask { .. }), Language::Fr) => {
                "Cette tâche n'existe pas".to_owned()
            }
            (Self::Validation(ValidationError::UnknownTask { .. }), Language::En) => {
                "This task does not exist".to_owned()
            }
            (Self::Auth(err), language) => err.describe_user_facing(language),
            (Self::Image(err), language) => err.describe_user_facing(language),
            (Self::Init(InitError::AlreadyInitialized), Language::Fr) => {
                "L'application est déjà initialisée".to_owned()
            }
            (Self::Init(InitError::AlreadyInitialized), Language::En) => {
                "The application is already initialized".to_owned()
            }
            (other, _) => other.to_string(),
        }
    }
}
