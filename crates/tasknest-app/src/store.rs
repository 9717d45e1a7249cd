//! Record-store collaborator: the hosted document database seen through the
//! operations the application needs.

use anyhow::Error;
use tasknest_core::{
    CategoryRecord, GateRecord, Task, TaskId, TaskInput, TaskPatch, UserId, UserPreferences, UserProfile,
};

/// Async document store holding tasks, reference categories, the gate
/// record, and user profiles.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Load every task owned by `owner`, in no particular order.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn fetch_tasks(&self, owner: &UserId) -> Result<Vec<Task>, Self::Error>;

    /// Load a single task.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, Self::Error>;

    /// Persist a new task and return it with its assigned identifier.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn create_task(&self, owner: &UserId, input: TaskInput) -> Result<Task, Self::Error>;

    /// Apply a partial update to an existing task.
    ///
    /// # Errors
    /// Returns a store-specific error when the task is missing or the write fails.
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), Self::Error>;

    /// Remove a task.
    ///
    /// # Errors
    /// Returns a store-specific error when the delete fails.
    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error>;

    /// Load every reference category record.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, Self::Error>;

    /// Persist a new reference category.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn add_category(&self, name: &str, system: bool) -> Result<CategoryRecord, Self::Error>;

    /// Read the singleton gate record.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    async fn read_gate(&self) -> Result<Option<GateRecord>, Self::Error>;

    /// Write the gate record only if none exists yet.
    ///
    /// Returns `false` when another writer got there first.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn create_gate_if_absent(&self, record: &GateRecord) -> Result<bool, Self::Error>;

    /// Load the profile document of a principal.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    async fn load_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, Self::Error>;

    /// Create or replace a profile document.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), Self::Error>;

    /// Replace the preferences of an existing profile.
    ///
    /// # Errors
    /// Returns a store-specific error when the profile is missing or the write fails.
    async fn update_preferences(&self, uid: &UserId, preferences: &UserPreferences) -> Result<(), Self::Error>;
}

impl<S: RecordStore> RecordStore for &S {
    type Error = S::Error;

    async fn fetch_tasks(&self, owner: &UserId) -> Result<Vec<Task>, Self::Error> {
        (**self).fetch_tasks(owner).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, Self::Error> {
        (**self).get_task(id).await
    }

    async fn create_task(&self, owner: &UserId, input: TaskInput) -> Result<Task, Self::Error> {
        (**self).create_task(owner, input).await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), Self::Error> {
        (**self).update_task(id, patch).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error> {
        (**self).delete_task(id).await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, Self::Error> {
        (**self).list_categories().await
    }

    async fn add_category(&self, name: &str, system: bool) -> Result<CategoryRecord, Self::Error> {
        (**self).add_category(name, system).await
    }

    async fn read_gate(&self) -> Result<Option<GateRecord>, Self::Error> {
        (**self).read_gate().await
    }

    async fn create_gate_if_absent(&self, record: &GateRecord) -> Result<bool, Self::Error> {
        (**self).create_gate_if_absent(record).await
    }

    async fn load_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, Self::Error> {
        (**self).load_profile(uid).await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), Self::Error> {
        (**self).save_profile(profile).await
    }

    async fn update_preferences(&self, uid: &UserId, preferences: &UserPreferences) -> Result<(), Self::Error> {
        (**self).update_preferences(uid, preferences).await
    }
}
