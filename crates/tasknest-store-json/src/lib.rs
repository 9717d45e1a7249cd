//! JSON-document storage and local identity for tasknest.
//!
//! Every collection lives in one document under the data directory and is
//! replaced atomically on each write.

mod document;
mod error;
mod identity;
mod lock;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tasknest_app::RecordStore;
use tasknest_core::{
    CategoryId, CategoryRecord, GateRecord, Task, TaskId, TaskInput, TaskPatch, UserId, UserPreferences,
    UserProfile,
};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::lock::{DirectoryLock, LockMode};

pub use error::JsonStoreError;
pub use identity::LocalIdentity;

const TASKS_FILE: &str = "tasks.json";
const CATEGORIES_FILE: &str = "categories.json";
const GATE_FILE: &str = "app_state.json";
const PROFILES_FILE: &str = "users.json";

type Profiles = BTreeMap<UserId, UserProfile>;

/// Record store backed by JSON documents in a data directory.
///
/// Every read-modify-write holds an exclusive lock on the directory, so
/// several handles or processes on the same directory never lose writes.
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open (creating if needed) the data directory at `root`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, JsonStoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn guard(&self, mode: LockMode) -> Result<DirectoryLock, JsonStoreError> {
        Ok(DirectoryLock::acquire(&self.root, mode)?)
    }

    fn modify<T, R>(&self, file: &str, edit: impl FnOnce(&mut T) -> Result<R, JsonStoreError>) -> Result<R, JsonStoreError>
    where
        T: serde::de::DeserializeOwned + serde::Serialize + Default,
    {
        let _guard = self.guard(LockMode::Exclusive)?;
        let path = self.path(file);
        let mut doc: T = document::read_or_default(&path)?;
        let out = edit(&mut doc)?;
        document::write(&path, &doc)?;
        Ok(out)
    }

    fn read<T>(&self, file: &str) -> Result<T, JsonStoreError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let _guard = self.guard(LockMode::Shared)?;
        document::read_or_default(&self.path(file))
    }

    /// Tasks owned by `owner`, in insertion order.
    ///
    /// # Errors
    /// Returns an error when the task document cannot be read.
    pub fn tasks_of(&self, owner: &UserId) -> Result<Vec<Task>, JsonStoreError> {
        let tasks: Vec<Task> = self.read(TASKS_FILE)?;
        Ok(tasks.into_iter().filter(|task| &task.user_id == owner).collect())
    }

    /// Look up a task by id.
    ///
    /// # Errors
    /// Returns an error when the task document cannot be read.
    pub fn task(&self, id: &TaskId) -> Result<Option<Task>, JsonStoreError> {
        let tasks: Vec<Task> = self.read(TASKS_FILE)?;
        Ok(tasks.into_iter().find(|task| &task.id == id))
    }

    /// Insert a task with a fresh id.
    ///
    /// # Errors
    /// Returns an error when the task document cannot be read or written.
    pub fn insert_task(&self, owner: &UserId, input: TaskInput) -> Result<Task, JsonStoreError> {
        let task = Task::from_input(TaskId::generate(), owner.clone(), input, OffsetDateTime::now_utc());
        self.modify(TASKS_FILE, |tasks: &mut Vec<Task>| {
            tasks.push(task.clone());
            Ok(())
        })?;
        info!(task = %task.id, owner = %owner, "Stored task");
        Ok(task)
    }

    /// Apply a patch to a stored task.
    ///
    /// # Errors
    /// Returns [`JsonStoreError::TaskNotFound`] for unknown ids, or an I/O error.
    pub fn patch_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), JsonStoreError> {
        self.modify(TASKS_FILE, |tasks: &mut Vec<Task>| {
            let task = tasks
                .iter_mut()
                .find(|task| &task.id == id)
                .ok_or_else(|| JsonStoreError::TaskNotFound(id.to_string()))?;
            task.apply(patch);
            Ok(())
        })
    }

    /// Remove a task. Removing an unknown id succeeds.
    ///
    /// # Errors
    /// Returns an error when the task document cannot be read or written.
    pub fn remove_task(&self, id: &TaskId) -> Result<(), JsonStoreError> {
        self.modify(TASKS_FILE, |tasks: &mut Vec<Task>| {
            let before = tasks.len();
            tasks.retain(|task| &task.id != id);
            if tasks.len() == before {
                debug!(task = %id, "Delete of unknown task ignored");
            }
            Ok(())
        })
    }

    /// Every reference category record.
    ///
    /// # Errors
    /// Returns an error when the category document cannot be read.
    pub fn categories(&self) -> Result<Vec<CategoryRecord>, JsonStoreError> {
        self.read(CATEGORIES_FILE)
    }

    /// Append a reference category.
    ///
    /// # Errors
    /// Returns an error when the category document cannot be read or written.
    pub fn insert_category(&self, name: &str, system: bool) -> Result<CategoryRecord, JsonStoreError> {
        let record = CategoryRecord {
            id: CategoryId::generate(),
            name: Some(name.to_owned()),
            system,
            created_at: OffsetDateTime::now_utc(),
        };
        self.modify(CATEGORIES_FILE, |records: &mut Vec<CategoryRecord>| {
            records.push(record.clone());
            Ok(())
        })?;
        Ok(record)
    }

    /// Singleton gate record, if written.
    ///
    /// # Errors
    /// Returns an error when the gate document exists but cannot be read.
    pub fn gate(&self) -> Result<Option<GateRecord>, JsonStoreError> {
        let _guard = self.guard(LockMode::Shared)?;
        document::read_optional(&self.path(GATE_FILE))
    }

    /// Write the gate record unless one already exists, even from another process.
    ///
    /// # Errors
    /// Returns an error when the document cannot be written.
    pub fn insert_gate(&self, record: &GateRecord) -> Result<bool, JsonStoreError> {
        let _guard = self.guard(LockMode::Exclusive)?;
        document::write_new(&self.path(GATE_FILE), record)
    }

    /// Profile document for `uid`.
    ///
    /// # Errors
    /// Returns an error when the profile document cannot be read.
    pub fn profile(&self, uid: &UserId) -> Result<Option<UserProfile>, JsonStoreError> {
        let profiles: Profiles = self.read(PROFILES_FILE)?;
        Ok(profiles.get(uid).cloned())
    }

    /// Create or replace a profile.
    ///
    /// # Errors
    /// Returns an error when the profile document cannot be read or written.
    pub fn put_profile(&self, profile: &UserProfile) -> Result<(), JsonStoreError> {
        self.modify(PROFILES_FILE, |profiles: &mut Profiles| {
            profiles.insert(profile.uid.clone(), profile.clone());
            Ok(())
        })
    }

    /// Replace the preferences of an existing profile.
    ///
    /// # Errors
    /// Returns [`JsonStoreError::ProfileNotFound`] for unknown users, or an I/O error.
    pub fn put_preferences(&self, uid: &UserId, preferences: &UserPreferences) -> Result<(), JsonStoreError> {
        self.modify(PROFILES_FILE, |profiles: &mut Profiles| {
            let profile = profiles
                .get_mut(uid)
                .ok_or_else(|| JsonStoreError::ProfileNotFound(uid.to_string()))?;
            profile.preferences = *preferences;
            Ok(())
        })
    }
}

impl RecordStore for JsonStore {
    type Error = JsonStoreError;

    async fn fetch_tasks(&self, owner: &UserId) -> Result<Vec<Task>, Self::Error> {
        self.tasks_of(owner)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, Self::Error> {
        self.task(id)
    }

    async fn create_task(&self, owner: &UserId, input: TaskInput) -> Result<Task, Self::Error> {
        self.insert_task(owner, input)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), Self::Error> {
        self.patch_task(id, patch)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error> {
        self.remove_task(id)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, Self::Error> {
        self.categories()
    }

    async fn add_category(&self, name: &str, system: bool) -> Result<CategoryRecord, Self::Error> {
        self.insert_category(name, system)
    }

    async fn read_gate(&self) -> Result<Option<GateRecord>, Self::Error> {
        self.gate()
    }

    async fn create_gate_if_absent(&self, record: &GateRecord) -> Result<bool, Self::Error> {
        self.insert_gate(record)
    }

    async fn load_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, Self::Error> {
        self.profile(uid)
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), Self::Error> {
        self.put_profile(profile)
    }

    async fn update_preferences(&self, uid: &UserId, preferences: &UserPreferences) -> Result<(), Self::Error> {
        self.put_preferences(uid, preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasknest_core::Priority;
    use tempfile::tempdir;

    #[test]
    fn tasks_survive_reopen_and_stay_owner_scoped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let ana = UserId::new("ana");
        let bo = UserId::new("bo");
        {
            let store = JsonStore::open(dir.path())?;
            store.insert_task(&ana, TaskInput::titled("mine"))?;
            store.insert_task(&bo, TaskInput::titled("theirs"))?;
        }

        let store = JsonStore::open(dir.path())?;
        let tasks = store.tasks_of(&ana)?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "mine");
        assert_eq!(tasks[0].priority, Priority::Medium);
        Ok(())
    }

    #[test]
    fn concurrent_handles_do_not_lose_writes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let owner = UserId::new("ana");
        let first = JsonStore::open(dir.path())?;
        let second = JsonStore::open(dir.path())?;

        std::thread::scope(|scope| {
            for store in [&first, &second] {
                let owner = &owner;
                scope.spawn(move || {
                    for n in 0..20 {
                        store
                            .insert_task(owner, TaskInput::titled(format!("task {n}")))
                            .unwrap_or_else(|err| panic!("insert failed: {err}"));
                    }
                });
            }
        });

        assert_eq!(first.tasks_of(&owner)?.len(), 40);
        Ok(())
    }

    #[test]
    fn patching_unknown_task_fails() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        let err = store
            .patch_task(&TaskId::new("missing"), &TaskPatch::completed(true))
            .err()
            .unwrap_or_else(|| panic!("patching a missing task must fail"));
        assert!(matches!(err, JsonStoreError::TaskNotFound(_)));
        store.remove_task(&TaskId::new("missing"))?;
        Ok(())
    }

    #[test]
    fn patch_clears_optional_fields() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        let owner = UserId::new("ana");
        let input = TaskInput {
            category: Some("Travail".into()),
            ..TaskInput::titled("filed")
        };
        let task = store.insert_task(&owner, input)?;

        let patch = TaskPatch {
            category: Some(None),
            ..TaskPatch::default()
        };
        store.patch_task(&task.id, &patch)?;
        let stored = store.task(&task.id)?.unwrap_or_else(|| panic!("task must exist"));
        assert!(stored.category.is_none());
        assert_eq!(stored.created_at, task.created_at);
        Ok(())
    }

    #[test]
    fn gate_is_written_once() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        assert!(store.gate()?.is_none());

        let first = GateRecord::written_by(None, OffsetDateTime::now_utc());
        assert!(store.insert_gate(&first)?);
        let second = GateRecord::written_by(Some(&UserId::new("late")), OffsetDateTime::now_utc());
        assert!(!store.insert_gate(&second)?);
        assert_eq!(store.gate()?, Some(first));
        Ok(())
    }

    #[test]
    fn preferences_require_an_existing_profile() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        let uid = UserId::new("ghost");
        assert!(matches!(
            store.put_preferences(&uid, &UserPreferences::default()),
            Err(JsonStoreError::ProfileNotFound(_))
        ));
        Ok(())
    }
}
