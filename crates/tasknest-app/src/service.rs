//! Task mutations with validation, shared by every surface.

use futures::future::join_all;
use tasknest_core::{Task, TaskId, TaskInput, TaskPatch, UserId, category_names};
use tracing::{info, warn};

use crate::error::{AppError, AppResult, ValidationError};
use crate::store::RecordStore;

/// Service façade that validates inputs and forwards mutations to the record store.
pub struct TodoService<S> {
    store: S,
}

impl<S> TodoService<S> {
    /// Wrap a record store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

/// Per-id outcome of a bulk mutation. Successful writes are never rolled back.
#[derive(Debug, Default)]
pub struct BulkReport {
    /// Identifiers written successfully.
    pub succeeded: Vec<TaskId>,
    /// Identifiers whose write failed, with the failure.
    pub failed: Vec<(TaskId, AppError)>,
}

impl BulkReport {
    /// True when every write went through.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::Empty { field: "title" });
    }
    Ok(())
}

impl<S: RecordStore> TodoService<S> {
    /// Load every task of `owner` in store order.
    ///
    /// # Errors
    /// Returns an error when the store query fails.
    pub async fn fetch_all(&self, owner: &UserId) -> AppResult<Vec<Task>> {
        self.store.fetch_tasks(owner).await.map_err(AppError::store)
    }

    /// Load a single task.
    ///
    /// # Errors
    /// Returns an error when the store read fails.
    pub async fn get(&self, id: &TaskId) -> AppResult<Option<Task>> {
        self.store.get_task(id).await.map_err(AppError::store)
    }

    /// Create a task for `owner`.
    ///
    /// # Errors
    /// Returns a validation error for a blank title, or the store error.
    pub async fn create(&self, owner: &UserId, input: TaskInput) -> AppResult<Task> {
        validate_title(&input.title)?;
        let task = self
            .store
            .create_task(owner, input)
            .await
            .map_err(AppError::store)?;
        info!(task = %task.id, owner = %owner, "Created task");
        Ok(task)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    /// Returns a validation error when the patch blanks the title, or the store error.
    pub async fn edit(&self, id: &TaskId, patch: &TaskPatch) -> AppResult<()> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        if patch.is_empty() {
            return Ok(());
        }
        self.store.update_task(id, patch).await.map_err(AppError::store)?;
        info!(task = %id, "Updated task");
        Ok(())
    }

    /// Set the completion flag.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn set_completed(&self, id: &TaskId, completed: bool) -> AppResult<()> {
        self.edit(id, &TaskPatch::completed(completed)).await
    }

    /// Replace the image reference of a task.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn set_image(&self, id: &TaskId, url: &str) -> AppResult<()> {
        self.edit(id, &TaskPatch::image(url)).await
    }

    /// Delete a task.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn remove(&self, id: &TaskId) -> AppResult<()> {
        self.store.delete_task(id).await.map_err(AppError::store)?;
        info!(task = %id, "Deleted task");
        Ok(())
    }

    /// Mark every task in `ids` completed. All writes are issued together.
    pub async fn bulk_complete(&self, ids: &[TaskId]) -> BulkReport {
        let patch = TaskPatch::completed(true);
        let results = join_all(ids.iter().map(|id| self.store.update_task(id, &patch))).await;
        Self::report("complete", ids, results)
    }

    /// Delete every task in `ids`. All deletes are issued together.
    pub async fn bulk_delete(&self, ids: &[TaskId]) -> BulkReport {
        let results = join_all(ids.iter().map(|id| self.store.delete_task(id))).await;
        Self::report("delete", ids, results)
    }

    /// Reference category names; a failing read degrades to an empty list.
    pub async fn category_names(&self) -> Vec<String> {
        match self.store.list_categories().await {
            Ok(records) => category_names(&records),
            Err(err) => {
                let err: anyhow::Error = err.into();
                warn!(error = %err, "Failed to load categories");
                Vec::new()
            }
        }
    }

    fn report(action: &str, ids: &[TaskId], results: Vec<Result<(), S::Error>>) -> BulkReport {
        let mut report = BulkReport::default();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => report.succeeded.push(id.clone()),
                Err(err) => {
                    let err = AppError::store(err);
                    warn!(task = %id, error = %err, action, "Bulk write failed");
                    report.failed.push((id.clone(), err));
                }
            }
        }
        info!(
            action,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Bulk write finished"
        );
        report
    }
}
