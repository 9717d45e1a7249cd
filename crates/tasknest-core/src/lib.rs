//! Domain types and pure derivations for tasknest task lists.
//!
//! Nothing in this crate performs I/O. Every function takes the batch of
//! records, the filter, and the current instant as explicit inputs so the
//! results are reproducible.

/// Reference category records and name derivation.
pub mod category;
/// Filters and the selection function.
pub mod filter;
/// One-time initialization gate and route guarding.
pub mod gate;
/// Identifier types.
pub mod id;
/// Hosted image reference helpers.
pub mod image;
/// Principals, profiles, and display preferences.
pub mod prefs;
/// Summary counts over a task batch.
pub mod stats;
/// Task records and their mutation inputs.
pub mod task;
/// Case-insensitive text matching for search queries.
pub mod text_matcher;

pub use category::{CategoryRecord, category_names};
pub use filter::{FilterBuildError, TodoFilter, TodoFilterBuilder, TodoFilterUpdate, select};
pub use gate::{GateRecord, InitState, Route, RouteDecision, SYSTEM_INITIALIZER};
pub use id::{CategoryId, TaskId, UserId};
pub use prefs::{Language, Principal, Theme, UserPreferences, UserProfile};
pub use stats::{DUE_SOON_WINDOW, PriorityCounts, Stats, aggregate, count_by_priority, due_between};
pub use task::{Priority, Task, TaskInput, TaskPatch};
pub use text_matcher::TextMatcher;
