//! One-time initialization: gate record, reference categories, demo data.

use tasknest_core::{
    CategoryRecord, GateRecord, InitState, Principal, Priority, Task, TaskInput, UserId, UserProfile,
    category_names,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::config::{DEFAULT_CATEGORIES, DemoAccount, SeedConfig};
use crate::error::{AppError, AppResult, ValidationError};
use crate::identity::IdentityProvider;
use crate::store::RecordStore;

/// Sample image attached to the welcome task.
pub const DEMO_IMAGE_URL: &str = "https://res.cloudinary.com/demo/image/upload/v1312461204/sample.jpg";

/// Owners with more than this many tasks receive a reduced demo set.
pub const DEMO_BUSY_THRESHOLD: usize = 5;

/// Size of the reduced demo set.
pub const DEMO_REDUCED_COUNT: usize = 3;

/// Initialization could not proceed.
#[derive(Debug, Error)]
pub enum InitError {
    /// Another initializer already wrote the gate record.
    #[error("application is already initialized")]
    AlreadyInitialized,
    /// The gate or seed write failed.
    #[error("initialization failed: {0}")]
    Store(anyhow::Error),
}

impl InitError {
    fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }
}

/// What [`InitGate::initialize`] should seed.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Reference category names.
    pub categories: Vec<String>,
    /// Demo principal to provision, if any.
    pub demo: Option<DemoAccount>,
}

impl InitOptions {
    /// Options taken from the `[seed]` configuration block.
    #[must_use]
    pub fn from_seed(seed: &SeedConfig) -> Self {
        Self {
            categories: seed.categories.clone(),
            demo: seed.demo_enabled.then(|| seed.demo.clone()),
        }
    }

    /// Skip the demo principal.
    #[must_use]
    pub fn without_demo(mut self) -> Self {
        self.demo = None;
        self
    }
}

impl Default for InitOptions {
    fn default() -> Self {
        Self::from_seed(&SeedConfig::default())
    }
}

/// Result of provisioning the demo principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoOutcome {
    /// No demo principal was requested.
    Skipped,
    /// The principal, its profile, and its tasks were written.
    Created {
        /// Demo principal.
        principal: Principal,
        /// Number of demo tasks written.
        tasks: usize,
    },
    /// Provisioning failed; initialization still succeeded.
    Failed(String),
}

/// Summary of a successful initialization.
#[derive(Debug, Clone)]
pub struct InitReport {
    /// Gate record that was written.
    pub gate: GateRecord,
    /// Reference categories that were written.
    pub categories: Vec<CategoryRecord>,
    /// Demo principal outcome.
    pub demo: DemoOutcome,
}

/// Coordinates the gate record with seeding.
pub struct InitGate<S, I> {
    store: S,
    identity: I,
}

impl<S: RecordStore, I: IdentityProvider> InitGate<S, I> {
    /// Pair the record store with the identity provider used for the demo principal.
    pub const fn new(store: S, identity: I) -> Self {
        Self { store, identity }
    }

    /// Read the gate record. A failed read is reported as uninitialized.
    pub async fn check(&self) -> InitState {
        match self.store.read_gate().await {
            Ok(record) => InitState::from_read::<()>(Ok(record.as_ref())),
            Err(err) => {
                let err: anyhow::Error = err.into();
                warn!(error = %err, "Failed to read initialization state");
                InitState::from_read(Err::<Option<&GateRecord>, _>(err))
            }
        }
    }

    /// Write the gate record, seed categories, and provision the demo principal.
    ///
    /// # Errors
    /// Returns [`InitError::AlreadyInitialized`] when the gate record already exists,
    /// or [`InitError::Store`] when the gate or a category cannot be written.
    /// Demo failures are reported in [`InitReport::demo`] instead.
    pub async fn initialize(&self, options: &InitOptions) -> Result<InitReport, InitError> {
        let initializer = self.identity.current_principal().map(|principal| principal.id);
        let gate = GateRecord::written_by(initializer.as_ref(), OffsetDateTime::now_utc());
        let created = self
            .store
            .create_gate_if_absent(&gate)
            .await
            .map_err(InitError::store)?;
        if !created {
            warn!("Initialization skipped: gate record already present");
            return Err(InitError::AlreadyInitialized);
        }
        info!(by = %gate.initialized_by, "Wrote initialization gate");

        let mut categories = Vec::with_capacity(options.categories.len());
        for name in &options.categories {
            let record = self
                .store
                .add_category(name, true)
                .await
                .map_err(InitError::store)?;
            categories.push(record);
        }
        info!(count = categories.len(), "Seeded reference categories");

        let demo = match &options.demo {
            None => DemoOutcome::Skipped,
            Some(account) => match self.provision_demo(account).await {
                Ok((principal, tasks)) => {
                    info!(uid = %principal.id, tasks, "Provisioned demo account");
                    DemoOutcome::Created { principal, tasks }
                }
                Err(err) => {
                    warn!(error = %err, "Failed to provision demo account");
                    DemoOutcome::Failed(err.to_string())
                }
            },
        };

        Ok(InitReport { gate, categories, demo })
    }

    /// Create the demo task set for the signed-in principal.
    ///
    /// Stored category names are used when available. Principals that already
    /// own more than [`DEMO_BUSY_THRESHOLD`] tasks receive [`DEMO_REDUCED_COUNT`] tasks.
    ///
    /// # Errors
    /// Returns [`ValidationError::SignedOut`] without a principal, or the store error.
    pub async fn seed_demo_tasks(&self) -> AppResult<Vec<Task>> {
        let owner = self
            .identity
            .current_principal()
            .ok_or(ValidationError::SignedOut)?
            .id;
        let names = match self.store.list_categories().await {
            Ok(records) => category_names(&records),
            Err(err) => {
                let err: anyhow::Error = err.into();
                warn!(error = %err, "Failed to load categories for demo data");
                Vec::new()
            }
        };
        let existing = self.store.fetch_tasks(&owner).await.map_err(AppError::store)?.len();
        let mut inputs = sample_tasks(&names, OffsetDateTime::now_utc());
        if existing > DEMO_BUSY_THRESHOLD {
            inputs.truncate(DEMO_REDUCED_COUNT);
        }

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let task = self
                .store
                .create_task(&owner, input)
                .await
                .map_err(AppError::store)?;
            created.push(task);
        }
        info!(owner = %owner, count = created.len(), "Created demo tasks");
        Ok(created)
    }

    async fn provision_demo(&self, account: &DemoAccount) -> anyhow::Result<(Principal, usize)> {
        let principal = self
            .identity
            .sign_up(&account.email, &account.password, &account.display_name)
            .await?;
        let now = OffsetDateTime::now_utc();
        self.store
            .save_profile(&UserProfile::for_principal(&principal, now))
            .await
            .map_err(Into::<anyhow::Error>::into)?;
        let inputs = welcome_tasks(now);
        let count = inputs.len();
        for input in inputs {
            self.store
                .create_task(&principal.id, input)
                .await
                .map_err(Into::<anyhow::Error>::into)?;
        }
        Ok((principal, count))
    }
}

fn due_in(now: OffsetDateTime, days: i64) -> Option<OffsetDateTime> {
    Some(now + Duration::days(days))
}

/// Tasks written for the demo principal during initialization.
fn welcome_tasks(now: OffsetDateTime) -> Vec<TaskInput> {
    vec![
        TaskInput {
            description: Some(
                "Cette tâche a été créée automatiquement pour vous montrer comment fonctionne l'application. \
                 N'hésitez pas à explorer toutes les fonctionnalités!"
                    .to_owned(),
            ),
            priority: Priority::High,
            category: Some("Projet".to_owned()),
            due_date: due_in(now, 1),
            image_url: Some(DEMO_IMAGE_URL.to_owned()),
            ..TaskInput::titled("Bienvenue dans Todo List!")
        },
        TaskInput {
            description: Some("Prendre rendez-vous pour le bilan annuel".to_owned()),
            completed: true,
            priority: Priority::High,
            category: Some("Santé".to_owned()),
            due_date: due_in(now, -1),
            ..TaskInput::titled("Appeler le médecin")
        },
    ]
}

/// Pick `preferred` when it is a known category, else the first known one.
fn pick_category(names: &[String], preferred: &str) -> String {
    match names.first() {
        Some(first) if !names.iter().any(|name| name == preferred) => first.clone(),
        _ => preferred.to_owned(),
    }
}

/// Tasks written by [`InitGate::seed_demo_tasks`].
fn sample_tasks(stored: &[String], now: OffsetDateTime) -> Vec<TaskInput> {
    let defaults: Vec<String> = DEFAULT_CATEGORIES.iter().map(|name| (*name).to_owned()).collect();
    let names = if stored.is_empty() { &defaults[..] } else { stored };
    vec![
        TaskInput {
            description: Some("Lait, pain, fruits, légumes et produits d'entretien".to_owned()),
            category: Some(pick_category(names, "Courses")),
            due_date: due_in(now, 1),
            image_url: Some(DEMO_IMAGE_URL.to_owned()),
            ..TaskInput::titled("Acheter des courses")
        },
        TaskInput {
            description: Some("Consulter le Dr. Martin pour le bilan annuel".to_owned()),
            completed: true,
            priority: Priority::High,
            category: Some(pick_category(names, "Santé")),
            due_date: due_in(now, -1),
            ..TaskInput::titled("Rendez-vous médical")
        },
        TaskInput {
            description: Some("Finaliser le rapport trimestriel pour la réunion".to_owned()),
            priority: Priority::High,
            category: Some(pick_category(names, "Travail")),
            due_date: due_in(now, 2),
            ..TaskInput::titled("Terminer le rapport")
        },
        TaskInput {
            description: Some("Ne pas oublier le lait pour le petit déjeuner".to_owned()),
            category: Some(pick_category(names, "Courses")),
            due_date: due_in(now, 1),
            ..TaskInput::titled("Acheter du lait")
        },
    ]
}

/// Owner of the demo data, if `outcome` created one.
#[must_use]
pub const fn demo_owner(outcome: &DemoOutcome) -> Option<&UserId> {
    match outcome {
        DemoOutcome::Created { principal, .. } => Some(&principal.id),
        DemoOutcome::Skipped | DemoOutcome::Failed(_) => None,
    }
}
