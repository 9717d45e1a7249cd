//! Owner-scoped task board: the fetched batch, the current filter, and derived views.

use tasknest_core::{
    PriorityCounts, Stats, Task, TaskId, TaskInput, TaskPatch, TodoFilter, TodoFilterUpdate, UserId, aggregate,
    count_by_priority, due_between, select,
};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{AppResult, ValidationError};
use crate::service::{BulkReport, TodoService};
use crate::store::RecordStore;

/// Source of "now" for statistics.
pub type Clock = fn() -> OffsetDateTime;

/// Holds one owner's batch and recomputes the filtered view and stats after every change.
///
/// Mutations always re-fetch the full batch; nothing is patched locally.
pub struct TodoBoard<S> {
    service: TodoService<S>,
    owner: UserId,
    filter: TodoFilter,
    batch: Vec<Task>,
    visible: Vec<Task>,
    categories: Vec<String>,
    stats: Stats,
    clock: Clock,
}

impl<S: RecordStore> TodoBoard<S> {
    /// Empty board for `owner`; call [`load`](Self::load) to populate it.
    pub fn new(store: S, owner: UserId) -> Self {
        Self {
            service: TodoService::new(store),
            owner,
            filter: TodoFilter::default(),
            batch: Vec::new(),
            visible: Vec::new(),
            categories: Vec::new(),
            stats: Stats::default(),
            clock: OffsetDateTime::now_utc,
        }
    }

    /// Replace the clock used for due-soon counts.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch tasks and categories. Category failures leave the list empty.
    ///
    /// # Errors
    /// Returns the store error when tasks cannot be fetched; the previous state is kept.
    pub async fn load(&mut self) -> AppResult<()> {
        self.reload_tasks().await?;
        self.categories = self.service.category_names().await;
        Ok(())
    }

    /// Same as [`load`](Self::load).
    ///
    /// # Errors
    /// Returns the store error when tasks cannot be fetched.
    pub async fn refresh(&mut self) -> AppResult<()> {
        self.load().await
    }

    /// Filtered, newest-first view.
    pub fn tasks(&self) -> &[Task] {
        &self.visible
    }

    /// Every task of the owner, in store order.
    pub fn all_tasks(&self) -> &[Task] {
        &self.batch
    }

    /// Owner of the board.
    pub const fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Current filter.
    pub const fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    /// Reference category names.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Counts over the full batch.
    pub const fn stats(&self) -> Stats {
        self.stats
    }

    /// Per-priority counts over the full batch.
    pub fn priority_counts(&self) -> PriorityCounts {
        count_by_priority(&self.batch)
    }

    /// Tasks due within `[start, end]`, earliest first.
    pub fn due_between(&self, start: OffsetDateTime, end: OffsetDateTime) -> Vec<Task> {
        due_between(&self.batch, start, end)
    }

    /// Change some fields of the filter; see [`TodoFilter::merge`].
    pub fn update_filter(&mut self, update: impl Into<TodoFilterUpdate>) {
        self.filter.merge(update);
        self.recompute_view();
    }

    /// Replace the whole filter.
    pub fn set_filter(&mut self, filter: TodoFilter) {
        self.filter = filter;
        self.recompute_view();
    }

    /// Reset to the empty filter.
    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.recompute_view();
    }

    /// Create a task, then re-fetch.
    ///
    /// # Errors
    /// Returns validation or store errors.
    pub async fn create(&mut self, input: TaskInput) -> AppResult<Task> {
        let task = self.service.create(&self.owner, input).await?;
        self.reload_tasks().await?;
        Ok(task)
    }

    /// Apply a patch, then re-fetch.
    ///
    /// # Errors
    /// Returns validation or store errors.
    pub async fn edit(&mut self, id: &TaskId, patch: &TaskPatch) -> AppResult<()> {
        self.service.edit(id, patch).await?;
        self.reload_tasks().await
    }

    /// Set the completion flag, then re-fetch.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn set_completed(&mut self, id: &TaskId, completed: bool) -> AppResult<()> {
        self.service.set_completed(id, completed).await?;
        self.reload_tasks().await
    }

    /// Flip the completion flag of a task in the batch. Returns the new value.
    ///
    /// # Errors
    /// Returns an error when the task is not in the batch, or the store error.
    pub async fn toggle(&mut self, id: &TaskId) -> AppResult<bool> {
        let completed = !self
            .batch
            .iter()
            .find(|task| &task.id == id)
            .ok_or_else(|| ValidationError::UnknownTask { id: id.clone() })?
            .completed;
        self.set_completed(id, completed).await?;
        Ok(completed)
    }

    /// Replace a task's image, then re-fetch.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn set_image(&mut self, id: &TaskId, url: &str) -> AppResult<()> {
        self.service.set_image(id, url).await?;
        self.reload_tasks().await
    }

    /// Delete a task, then re-fetch.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn remove(&mut self, id: &TaskId) -> AppResult<()> {
        self.service.remove(id).await?;
        self.reload_tasks().await
    }

    /// Complete many tasks, then re-fetch regardless of partial failure.
    ///
    /// # Errors
    /// Returns the store error when the re-fetch fails.
    pub async fn bulk_complete(&mut self, ids: &[TaskId]) -> AppResult<BulkReport> {
        let report = self.service.bulk_complete(ids).await;
        self.reload_tasks().await?;
        Ok(report)
    }

    /// Delete many tasks, then re-fetch regardless of partial failure.
    ///
    /// # Errors
    /// Returns the store error when the re-fetch fails.
    pub async fn bulk_delete(&mut self, ids: &[TaskId]) -> AppResult<BulkReport> {
        let report = self.service.bulk_delete(ids).await;
        self.reload_tasks().await?;
        Ok(report)
    }

    async fn reload_tasks(&mut self) -> AppResult<()> {
        self.batch = self.service.fetch_all(&self.owner).await?;
        self.stats = aggregate(&self.batch, (self.clock)());
        self.recompute_view();
        debug!(owner = %self.owner, total = self.stats.total, "Reloaded tasks");
        Ok(())
    }

    fn recompute_view(&mut self) {
        self.visible = select(&self.batch, &self.filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::MemoryStore;
    use tasknest_core::Priority;
    use time::{Duration, macros::datetime};

    fn fixed_now() -> OffsetDateTime {
        datetime!(2025-03-10 12:00 UTC)
    }

    fn owner() -> UserId {
        UserId::new("owner")
    }

    async fn seeded(store: &MemoryStore) -> anyhow::Result<()> {
        let other = UserId::new("someone-else");
        let service = TodoService::new(store);
        for (offset, title, priority, due) in [
            (0, "Buy milk", Priority::Low, None),
            (1, "Write report", Priority::High, Some(fixed_now() + Duration::days(1))),
            (2, "Call mom", Priority::Medium, Some(fixed_now() + Duration::days(5))),
        ] {
            let input = TaskInput {
                priority,
                due_date: due,
                created_at: Some(fixed_now() - Duration::hours(10 - offset)),
                ..TaskInput::titled(title)
            };
            service.create(&owner(), input).await?;
        }
        service.create(&other, TaskInput::titled("Not mine")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn load_scopes_to_owner_and_sorts_newest_first() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;

        let titles: Vec<_> = board.tasks().iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, ["Call mom", "Write report", "Buy milk"]);
        let stats = board.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.high_priority, 1);
        assert_eq!(stats.due_soon, 1);
        Ok(())
    }

    #[tokio::test]
    async fn filters_narrow_the_view_but_not_the_stats() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;

        board.update_filter(TodoFilter::builder().search("MILK").build());
        assert_eq!(board.tasks().len(), 1);
        board.update_filter(TodoFilter::builder().priority(Priority::High).build());
        assert!(board.tasks().is_empty());
        assert_eq!(board.stats().total, 3);

        board.clear_filters();
        assert_eq!(board.tasks().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn relaxing_one_dimension_keeps_the_others() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;

        board.update_filter(TodoFilter::builder().priority(Priority::High).completed(false).build());
        assert_eq!(board.tasks().len(), 1);

        board.update_filter(TodoFilterUpdate::any_priority());
        assert_eq!(board.filter().priority, None);
        assert_eq!(board.filter().completed, Some(false));
        assert_eq!(board.tasks().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn toggling_an_unknown_task_is_a_lookup_error() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;

        let Err(err) = board.toggle(&TaskId::new("missing")).await else {
            panic!("unknown task must not toggle");
        };
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnknownTask { ref id }) if id.as_str() == "missing"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn mutations_refetch_and_recompute() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        store.set_clock(fixed_now());
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;

        let task = board.create(TaskInput::titled("Fresh")).await?;
        assert_eq!(board.stats().pending, 1);

        assert!(board.toggle(&task.id).await?);
        assert_eq!(board.stats().completed, 1);
        assert!(!board.toggle(&task.id).await?);
        assert_eq!(board.stats().completed, 0);

        board.remove(&task.id).await?;
        assert_eq!(board.stats().total, 0);
        assert!(board.tasks().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_state() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;

        store.fail_fetch(true);
        assert!(board.refresh().await.is_err());
        assert_eq!(board.tasks().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn category_failure_does_not_fail_the_load() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        store.fail_categories();
        let mut board = TodoBoard::new(&store, owner());
        board.load().await?;
        assert!(board.categories().is_empty());
        assert_eq!(board.all_tasks().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn bulk_operations_report_and_refetch() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        seeded(&store).await?;
        let mut board = TodoBoard::new(&store, owner()).with_clock(fixed_now);
        board.load().await?;
        let ids: Vec<_> = board.tasks().iter().map(|task| task.id.clone()).collect();

        let report = board.bulk_complete(&ids).await?;
        assert!(report.is_complete());
        assert_eq!(board.stats().completed, 3);
        assert_eq!(board.priority_counts().get(Priority::High), 1);

        let due = board.due_between(fixed_now(), fixed_now() + Duration::days(7));
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].title, "Write report");
        Ok(())
    }
}
