use crate::task::Task;

/// Case-insensitive substring matcher for task titles and descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for the empty query.
    ///
    /// Whitespace is significant: a query of `" "` only matches text containing a space.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        if query.is_empty() {
            return None;
        }
        Some(Self {
            needle: query.to_lowercase(),
        })
    }

    /// Lower-cased query.
    #[must_use]
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Determine whether the title or the description contains the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_field(&task.title)
            || task
                .description
                .as_deref()
                .is_some_and(|description| self.matches_field(description))
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{TaskId, UserId};
    use crate::task::TaskInput;
    use time::OffsetDateTime;

    fn task(title: &str, description: Option<&str>) -> Task {
        Task::from_input(
            TaskId::generate(),
            UserId::new("owner"),
            TaskInput {
                title: title.into(),
                description: description.map(str::to_owned),
                ..TaskInput::default()
            },
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn matcher_skips_empty_query() {
        assert!(TextMatcher::new("").is_none());
    }

    #[test]
    fn whitespace_query_is_a_real_constraint() {
        let matcher = TextMatcher::new(" ").unwrap_or_else(|| panic!("non-empty query must build"));
        assert!(matcher.matches(&task("Buy milk", None)));
        assert!(!matcher.matches(&task("Groceries", None)));
    }

    #[test]
    fn matcher_checks_title_and_description() {
        let matcher = TextMatcher::new("MILK").unwrap_or_else(|| panic!("matcher must exist"));
        assert!(matcher.matches(&task("Buy milk", None)));
        assert!(matcher.matches(&task("Groceries", Some("Oat MILK and bread"))));
        assert!(!matcher.matches(&task("Walk dog", Some("around the park"))));
    }

    #[test]
    fn matcher_folds_non_ascii_case() {
        let matcher = TextMatcher::new("SANTÉ").unwrap_or_else(|| panic!("matcher must exist"));
        assert_eq!(matcher.needle(), "santé");
        assert!(matcher.matches(&task("Rendez-vous santé", None)));
    }
}
