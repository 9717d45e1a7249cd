use crate::id::CategoryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Shared reference category as stored in the category collection.
///
/// Task categories are free text; nothing ties a task's label to one of these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    /// Store-assigned identifier.
    pub id: CategoryId,
    /// Display name; records without one are ignored.
    #[serde(default)]
    pub name: Option<String>,
    /// Seeded during initialization rather than created by a user.
    #[serde(default)]
    pub system: bool,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Deduplicated, alphabetically sorted category names. Records lacking a name
/// (or carrying an empty one) are dropped.
#[must_use]
pub fn category_names(records: &[CategoryRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.name.as_deref())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: Option<&str>) -> CategoryRecord {
        CategoryRecord {
            id: CategoryId::generate(),
            name: name.map(str::to_owned),
            system: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn names_are_sorted_deduplicated_and_nameless_records_dropped() {
        let records = vec![
            record(Some("Work")),
            record(None),
            record(Some("Home")),
            record(Some("Work")),
            record(Some("")),
            record(Some("Errands")),
        ];
        assert_eq!(category_names(&records), vec!["Errands", "Home", "Work"]);
    }

    #[test]
    fn no_records_yield_no_names() {
        assert!(category_names(&[]).is_empty());
    }
}
