use crate::task::{Priority, Task};
use crate::text_matcher::TextMatcher;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// Transient, client-held query over a task batch.
///
/// Every field is optional; an absent field places no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilter {
    /// Exact completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Exact priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Exact category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Case-insensitive substring of title or description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
}

impl TodoFilter {
    /// Start a builder.
    #[must_use]
    pub fn builder() -> TodoFilterBuilder {
        TodoFilterBuilder::new()
    }

    /// True when no field constrains the selection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_none()
            && self.priority.is_none()
            && self.category.as_deref().is_none_or(str::is_empty)
            && self.search_query.as_deref().is_none_or(str::is_empty)
    }

    /// Apply a field-by-field update. Fields the update leaves out are kept;
    /// `Some(None)` relaxes that dimension back to "no constraint".
    pub fn merge(&mut self, update: impl Into<TodoFilterUpdate>) {
        let update = update.into();
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(search_query) = update.search_query {
            self.search_query = search_query;
        }
    }

    /// Reset every field to "no constraint".
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check a single task against every present field.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let matcher = self.search_query.as_deref().and_then(TextMatcher::new);
        self.matches_with(task, matcher.as_ref())
    }

    fn matches_with(&self, task: &Task, matcher: Option<&TextMatcher>) -> bool {
        if self.completed.is_some_and(|completed| task.completed != completed) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        if let Some(category) = self.category.as_deref().filter(|category| !category.is_empty())
            && task.category.as_deref() != Some(category)
        {
            return false;
        }
        matcher.is_none_or(|matcher| matcher.matches(task))
    }
}

/// Partial change to a [`TodoFilter`].
///
/// The outer `Option` says whether the field changes; the inner one is the new
/// value, where `None` removes the constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilterUpdate {
    /// New completion constraint.
    pub completed: Option<Option<bool>>,
    /// New priority constraint.
    pub priority: Option<Option<Priority>>,
    /// New category constraint.
    pub category: Option<Option<String>>,
    /// New search text.
    pub search_query: Option<Option<String>>,
}

impl TodoFilterUpdate {
    /// Update that removes the completion constraint.
    #[must_use]
    pub fn any_status() -> Self {
        Self {
            completed: Some(None),
            ..Self::default()
        }
    }

    /// Update that removes the priority constraint.
    #[must_use]
    pub fn any_priority() -> Self {
        Self {
            priority: Some(None),
            ..Self::default()
        }
    }

    /// Update that removes the category constraint.
    #[must_use]
    pub fn any_category() -> Self {
        Self {
            category: Some(None),
            ..Self::default()
        }
    }
}

/// Only the fields present in the filter change.
impl From<TodoFilter> for TodoFilterUpdate {
    fn from(filter: TodoFilter) -> Self {
        Self {
            completed: filter.completed.map(Some),
            priority: filter.priority.map(Some),
            category: filter.category.map(Some),
            search_query: filter.search_query.map(Some),
        }
    }
}

/// Select the tasks satisfying every present field of `filter`, newest first.
///
/// Callers scope `tasks` to a single owner beforehand. The sort on
/// `created_at` is stable, so tasks created at the same instant keep their
/// input order.
#[must_use]
pub fn select(tasks: &[Task], filter: &TodoFilter) -> Vec<Task> {
    let matcher = filter.search_query.as_deref().and_then(TextMatcher::new);
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| filter.matches_with(task, matcher.as_ref()))
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    selected
}

/// Error type returned while constructing filters from user-facing inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterBuildError {
    /// The priority token is not one of low/medium/high.
    #[error("invalid priority: {token}")]
    InvalidPriority {
        /// Offending input.
        token: String,
    },
    /// The completion token is not a recognised status.
    #[error("invalid status: {token}")]
    InvalidStatus {
        /// Offending input.
        token: String,
    },
}

/// Builder that accepts user-facing strings and normalizes them into a [`TodoFilter`].
#[derive(Debug, Clone, Default)]
pub struct TodoFilterBuilder {
    filter: TodoFilter,
}

impl TodoFilterBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact completion flag.
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.filter.completed = Some(completed);
        self
    }

    /// Require an exact priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.filter.priority = Some(priority);
        self
    }

    /// Require an exact category (blank inputs are ignored).
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.is_empty() {
            self.filter.category = Some(category);
        }
        self
    }

    /// Configure the search text (the empty string places no constraint).
    #[must_use]
    pub fn search(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.filter.search_query = (!query.is_empty()).then_some(query);
        self
    }

    /// Parse a status token: `completed`/`done`/`true` or `pending`/`active`/`false`.
    ///
    /// # Errors
    /// Returns an error if the token names no known status.
    pub fn status_token(self, token: &str) -> Result<Self, FilterBuildError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "completed" | "done" | "true" => Ok(self.completed(true)),
            "pending" | "active" | "false" => Ok(self.completed(false)),
            _ => Err(FilterBuildError::InvalidStatus {
                token: token.to_owned(),
            }),
        }
    }

    /// Parse a priority token.
    ///
    /// # Errors
    /// Returns an error if the token is not low/medium/high.
    pub fn priority_token(self, token: &str) -> Result<Self, FilterBuildError> {
        token
            .parse::<Priority>()
            .map(|priority| self.priority(priority))
            .map_err(|_| FilterBuildError::InvalidPriority {
                token: token.to_owned(),
            })
    }

    /// Build the final [`TodoFilter`].
    #[must_use]
    pub fn build(self) -> TodoFilter {
        self.filter
    }
}

impl Display for TodoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(completed) = self.completed {
            parts.push(format!("completed={completed}"));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("priority={priority}"));
        }
        if let Some(category) = self.category.as_deref().filter(|category| !category.is_empty()) {
            parts.push(format!("category={category}"));
        }
        if let Some(query) = &self.search_query {
            parts.push(format!("search={query:?}"));
        }
        if parts.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}
