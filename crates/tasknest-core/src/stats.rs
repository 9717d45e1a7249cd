use crate::task::{Priority, Task};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Width of the "due soon" window measured from the current instant.
pub const DUE_SOON_WINDOW: Duration = Duration::days(3);

/// Summary counts derived from a full (unfiltered) task batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of tasks.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// `total - completed`.
    pub pending: usize,
    /// High-priority tasks that are not completed.
    pub high_priority: usize,
    /// Pending tasks due strictly inside `(now, now + 3 days)`.
    pub due_soon: usize,
}

/// Compute [`Stats`] over `tasks` as of `now`.
#[must_use]
pub fn aggregate(tasks: &[Task], now: OffsetDateTime) -> Stats {
    let horizon = now + DUE_SOON_WINDOW;
    let mut stats = Stats {
        total: tasks.len(),
        ..Stats::default()
    };
    for task in tasks {
        if task.completed {
            stats.completed += 1;
            continue;
        }
        if task.priority == Priority::High {
            stats.high_priority += 1;
        }
        if task.due_date.is_some_and(|due| due > now && due < horizon) {
            stats.due_soon += 1;
        }
    }
    stats.pending = stats.total - stats.completed;
    stats
}

/// Task counts per priority, completed tasks included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    /// Low-priority tasks.
    pub low: usize,
    /// Medium-priority tasks.
    pub medium: usize,
    /// High-priority tasks.
    pub high: usize,
}

impl PriorityCounts {
    /// Count for a single priority.
    #[must_use]
    pub const fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

/// Count tasks per priority.
#[must_use]
pub fn count_by_priority(tasks: &[Task]) -> PriorityCounts {
    tasks.iter().fold(PriorityCounts::default(), |mut counts, task| {
        match task.priority {
            Priority::Low => counts.low += 1,
            Priority::Medium => counts.medium += 1,
            Priority::High => counts.high += 1,
        }
        counts
    })
}

/// Tasks with a due date inside `[start, end]` (inclusive), earliest deadline first.
#[must_use]
pub fn due_between(tasks: &[Task], start: OffsetDateTime, end: OffsetDateTime) -> Vec<Task> {
    let mut due: Vec<Task> = tasks
        .iter()
        .filter(|task| task.due_date.is_some_and(|due| due >= start && due <= end))
        .cloned()
        .collect();
    due.sort_by_key(|task| task.due_date);
    due
}
