use crate::id::{TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

/// Urgency classification of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Regular work.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Every priority, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token does not name a priority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownPriority(s.to_owned())),
        }
    }
}

/// A user-owned work item as held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier; immutable.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Free-form details.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the task is done.
    #[serde(default)]
    pub completed: bool,
    /// Creation instant; never mutated.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Optional deadline.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    /// Hosted image URL or inline `data:` URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Urgency.
    pub priority: Priority,
    /// Free-text category label (not a foreign key).
    #[serde(default)]
    pub category: Option<String>,
    /// Owning principal; immutable.
    pub user_id: UserId,
}

impl Task {
    /// Build the stored record for a creation input.
    #[must_use]
    pub fn from_input(id: TaskId, owner: UserId, input: TaskInput, now: OffsetDateTime) -> Self {
        Self {
            id,
            title: input.title,
            description: input.description,
            completed: input.completed,
            created_at: input.created_at.unwrap_or(now),
            due_date: input.due_date,
            image_url: input.image_url,
            priority: input.priority,
            category: input.category,
            user_id: owner,
        }
    }

    /// Apply a partial update. Identity fields (`id`, `user_id`, `created_at`) are untouched.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url.clone_from(image_url);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = &patch.category {
            self.category.clone_from(category);
        }
    }
}

/// Fields supplied when creating a task. The store assigns `id` and the
/// owner comes from the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// Title; must not be blank.
    pub title: String,
    /// Optional details.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Optional deadline.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    /// Optional image reference.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Urgency (defaults to medium).
    #[serde(default)]
    pub priority: Priority,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Override for the creation instant (seeding only).
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl TaskInput {
    /// Start an input with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a task.
///
/// Outer `None` leaves a field untouched; for clearable fields the inner
/// `None` removes the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New or cleared description.
    pub description: Option<Option<String>>,
    /// New completion flag.
    pub completed: Option<bool>,
    /// New or cleared deadline.
    pub due_date: Option<Option<OffsetDateTime>>,
    /// New or cleared image.
    pub image_url: Option<Option<String>>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New or cleared category.
    pub category: Option<Option<String>>,
}

impl TaskPatch {
    /// Patch that only flips the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Patch that only replaces the image reference.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(Some(url.into())),
            ..Self::default()
        }
    }

    /// True when applying the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
            && self.image_url.is_none()
            && self.priority.is_none()
            && self.category.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Task {
        Task::from_input(
            TaskId::new("t1"),
            UserId::new("u1"),
            TaskInput {
                title: "Buy milk".into(),
                description: Some("two bottles".into()),
                category: Some("Courses".into()),
                ..TaskInput::default()
            },
            datetime!(2025-03-01 10:00 UTC),
        )
    }

    #[test]
    fn priority_tokens_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" low ".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn from_input_defaults_to_pending_medium() {
        let task = sample();
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at, datetime!(2025-03-01 10:00 UTC));
        assert_eq!(task.user_id, UserId::new("u1"));
    }

    #[test]
    fn patch_clears_and_keeps_identity() {
        let mut task = sample();
        let patch = TaskPatch {
            title: Some("Buy oat milk".into()),
            description: Some(None),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        };
        task.apply(&patch);

        assert_eq!(task.title, "Buy oat milk");
        assert!(task.description.is_none());
        assert_eq!(task.category.as_deref(), Some("Courses"));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.id, TaskId::new("t1"));
        assert_eq!(task.created_at, datetime!(2025-03-01 10:00 UTC));
    }

    #[test]
    fn task_roundtrips_through_camel_case_json() {
        let task = sample();
        let json = serde_json::to_value(&task).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["createdAt"], "2025-03-01T10:00:00Z");
        let back: Task = serde_json::from_value(json).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(back, task);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::completed(true).is_empty());
    }
}
