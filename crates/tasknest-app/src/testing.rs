//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, anyhow};
use tasknest_core::{
    CategoryId, CategoryRecord, GateRecord, Principal, Task, TaskId, TaskInput, TaskPatch, UserId,
    UserPreferences, UserProfile,
};
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::identity::{AuthError, AuthErrorCode, IdentityProvider, MIN_PASSWORD_LEN};
use crate::store::RecordStore;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    categories: Mutex<Vec<CategoryRecord>>,
    gate: Mutex<Option<GateRecord>>,
    profiles: Mutex<HashMap<UserId, UserProfile>>,
    failing_writes: Mutex<HashSet<TaskId>>,
    fail_categories: Mutex<bool>,
    fail_gate_read: Mutex<bool>,
    fail_fetch: Mutex<bool>,
    fail_profiles: Mutex<bool>,
    create_calls: Mutex<u32>,
    clock: Mutex<Option<OffsetDateTime>>,
}

impl MemoryStore {
    pub fn create_calls(&self) -> u32 {
        *guard(&self.create_calls)
    }

    pub fn fail_writes_for(&self, id: &TaskId) {
        guard(&self.failing_writes).insert(id.clone());
    }

    pub fn fail_categories(&self) {
        *guard(&self.fail_categories) = true;
    }

    pub fn fail_gate_read(&self) {
        *guard(&self.fail_gate_read) = true;
    }

    pub fn fail_fetch(&self, failing: bool) {
        *guard(&self.fail_fetch) = failing;
    }

    pub fn fail_profiles(&self) {
        *guard(&self.fail_profiles) = true;
    }

    /// Pin the creation instant handed to new tasks.
    pub fn set_clock(&self, now: OffsetDateTime) {
        *guard(&self.clock) = Some(now);
    }

    pub fn gate(&self) -> Option<GateRecord> {
        guard(&self.gate).clone()
    }

    pub fn categories(&self) -> Vec<CategoryRecord> {
        guard(&self.categories).clone()
    }

    pub fn profile(&self, uid: &UserId) -> Option<UserProfile> {
        guard(&self.profiles).get(uid).cloned()
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        guard(&self.tasks).clone()
    }

    fn now(&self) -> OffsetDateTime {
        guard(&self.clock).unwrap_or_else(OffsetDateTime::now_utc)
    }
}

impl RecordStore for MemoryStore {
    type Error = anyhow::Error;

    async fn fetch_tasks(&self, owner: &UserId) -> Result<Vec<Task>> {
        if *guard(&self.fail_fetch) {
            return Err(anyhow!("fetch unavailable"));
        }
        Ok(guard(&self.tasks)
            .iter()
            .filter(|task| &task.user_id == owner)
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        Ok(guard(&self.tasks).iter().find(|task| &task.id == id).cloned())
    }

    async fn create_task(&self, owner: &UserId, input: TaskInput) -> Result<Task> {
        *guard(&self.create_calls) += 1;
        let task = Task::from_input(TaskId::generate(), owner.clone(), input, self.now());
        guard(&self.tasks).push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<()> {
        if guard(&self.failing_writes).contains(id) {
            return Err(anyhow!("write rejected for {id}"));
        }
        let mut tasks = guard(&self.tasks);
        let task = tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        task.apply(patch);
        drop(tasks);
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        if guard(&self.failing_writes).contains(id) {
            return Err(anyhow!("delete rejected for {id}"));
        }
        guard(&self.tasks).retain(|task| &task.id != id);
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>> {
        if *guard(&self.fail_categories) {
            return Err(anyhow!("categories unavailable"));
        }
        Ok(self.categories())
    }

    async fn add_category(&self, name: &str, system: bool) -> Result<CategoryRecord> {
        let record = CategoryRecord {
            id: CategoryId::generate(),
            name: Some(name.to_owned()),
            system,
            created_at: self.now(),
        };
        guard(&self.categories).push(record.clone());
        Ok(record)
    }

    async fn read_gate(&self) -> Result<Option<GateRecord>> {
        if *guard(&self.fail_gate_read) {
            return Err(anyhow!("gate unavailable"));
        }
        Ok(self.gate())
    }

    async fn create_gate_if_absent(&self, record: &GateRecord) -> Result<bool> {
        let mut gate = guard(&self.gate);
        if gate.is_some() {
            return Ok(false);
        }
        *gate = Some(record.clone());
        drop(gate);
        Ok(true)
    }

    async fn load_profile(&self, uid: &UserId) -> Result<Option<UserProfile>> {
        if *guard(&self.fail_profiles) {
            return Err(anyhow!("profiles unavailable"));
        }
        Ok(self.profile(uid))
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        if *guard(&self.fail_profiles) {
            return Err(anyhow!("profiles unavailable"));
        }
        guard(&self.profiles).insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn update_preferences(&self, uid: &UserId, preferences: &UserPreferences) -> Result<()> {
        if *guard(&self.fail_profiles) {
            return Err(anyhow!("profiles unavailable"));
        }
        let mut profiles = guard(&self.profiles);
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| anyhow!("profile not found: {uid}"))?;
        profile.preferences = *preferences;
        drop(profiles);
        Ok(())
    }
}

struct Account {
    principal: Principal,
    password: String,
}

pub struct MockIdentity {
    accounts: Mutex<BTreeMap<String, Account>>,
    sender: watch::Sender<Option<Principal>>,
    refuse_sign_up: Mutex<bool>,
}

impl Default for MockIdentity {
    fn default() -> Self {
        let (sender, _receiver) = watch::channel(None);
        Self {
            accounts: Mutex::new(BTreeMap::new()),
            sender,
            refuse_sign_up: Mutex::new(false),
        }
    }
}

impl MockIdentity {
    pub fn refuse_sign_up(&self) {
        *guard(&self.refuse_sign_up) = true;
    }
}

impl IdentityProvider for MockIdentity {
    fn current_principal(&self) -> Option<Principal> {
        self.sender.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.sender.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Principal, AuthError> {
        if *guard(&self.refuse_sign_up) {
            return Err(AuthError::new(AuthErrorCode::from_code("auth/operation-not-allowed"), "disabled"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::new(AuthErrorCode::WeakPassword, "weak"));
        }
        let mut accounts = guard(&self.accounts);
        if accounts.contains_key(email) {
            return Err(AuthError::new(AuthErrorCode::EmailAlreadyInUse, "taken"));
        }
        let principal = Principal {
            id: UserId::generate(),
            email: email.to_owned(),
            display_name: Some(display_name.to_owned()),
            photo_url: None,
        };
        accounts.insert(
            email.to_owned(),
            Account {
                principal: principal.clone(),
                password: password.to_owned(),
            },
        );
        drop(accounts);
        self.sender.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let accounts = guard(&self.accounts);
        let account = accounts
            .get(email)
            .ok_or_else(|| AuthError::new(AuthErrorCode::UserNotFound, "missing"))?;
        if account.password != password {
            return Err(AuthError::new(AuthErrorCode::WrongPassword, "mismatch"));
        }
        let principal = account.principal.clone();
        drop(accounts);
        self.sender.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sender.send_replace(None);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        if guard(&self.accounts).contains_key(email) {
            Ok(())
        } else {
            Err(AuthError::new(AuthErrorCode::UserNotFound, "missing"))
        }
    }
}
