//! Application layer for tasknest.
//!
//! Collaborator traits for the record store, identity provider, and image host,
//! plus the services built on them that every surface shares.

pub mod account;
pub mod board;
pub mod config;
pub mod error;
pub mod identity;
pub mod image;
pub mod init;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use account::AccountService;
pub use board::{Clock, TodoBoard};
pub use config::{DemoAccount, ImageConfig, PreferencesConfig, ProjectConfig, SeedConfig};
pub use error::{AppError, AppResult, ValidationError};
pub use identity::{AuthError, AuthErrorCode, AuthOperation, IdentityProvider};
pub use image::{
    FallbackReason, HostError, HttpImageHost, ImageError, ImageFile, ImageHost, ImageUploader, UploadOutcome,
};
pub use init::{DemoOutcome, InitError, InitGate, InitOptions, InitReport};
pub use service::{BulkReport, TodoService};
pub use session::{Session, SessionContext};
pub use store::RecordStore;
