//! Fixture files for seeding a [`DataStore`].
//!
//! A fixture is one JSON or YAML document with a list per record kind.
//! The format is picked from the file extension (`.yaml`/`.yml` is YAML,
//! anything else is JSON).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    DataStore, StoredAccount, StoredAccountUser, StoredAssignment, StoredCourse, StoredEnrollment,
    StoredOutcome, StoredOutcomeGroup, StoredRecord, StoredSubmission, StoredTerm,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub accounts: Vec<StoredAccount>,
    pub courses: Vec<StoredCourse>,
    pub terms: Vec<StoredTerm>,
    pub outcomes: Vec<StoredOutcome>,
    pub outcome_groups: Vec<StoredOutcomeGroup>,
    pub assignments: Vec<StoredAssignment>,
    pub submissions: Vec<StoredSubmission>,
    pub enrollments: Vec<StoredEnrollment>,
    pub account_users: Vec<StoredAccountUser>,
}

impl Fixture {
    /// Reads and parses a fixture file.
    pub fn from_path(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let fixture_error = |message: String| StorageError::FixtureError {
            path: path.display().to_string(),
            message,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| fixture_error(e.to_string()))
        } else {
            serde_json::from_str(&contents).map_err(|e| fixture_error(e.to_string()))
        }
    }

    pub fn record_count(&self) -> usize {
        self.accounts.len()
            + self.courses.len()
            + self.terms.len()
            + self.outcomes.len()
            + self.outcome_groups.len()
            + self.assignments.len()
            + self.submissions.len()
            + self.enrollments.len()
            + self.account_users.len()
    }

    /// Flattens the fixture into records in an order that satisfies
    /// foreign keys: accounts parents-first, then everything that hangs
    /// off accounts, courses, groups and assignments.
    pub fn into_records(self) -> Vec<StoredRecord> {
        let mut records = Vec::with_capacity(self.record_count());

        records.extend(
            parents_first(self.accounts, |a| a.id, |a| a.parent_account_id)
                .into_iter()
                .map(StoredRecord::Account),
        );
        records.extend(self.courses.into_iter().map(StoredRecord::Course));
        records.extend(self.terms.into_iter().map(StoredRecord::Term));
        records.extend(self.outcomes.into_iter().map(StoredRecord::Outcome));
        records.extend(
            parents_first(self.outcome_groups, |g| g.id, |g| g.parent_group_id)
                .into_iter()
                .map(StoredRecord::OutcomeGroup),
        );
        records.extend(self.assignments.into_iter().map(StoredRecord::Assignment));
        records.extend(self.submissions.into_iter().map(StoredRecord::Submission));
        records.extend(self.enrollments.into_iter().map(StoredRecord::Enrollment));
        records.extend(self.account_users.into_iter().map(StoredRecord::AccountUser));

        records
    }
}

/// Orders records so that every parent precedes its children.
///
/// Parents missing from the input do not hold a record back. Cycles are
/// appended as-is and left for the store to reject as dangling references.
fn parents_first<T>(
    mut pending: Vec<T>,
    id: impl Fn(&T) -> u64,
    parent: impl Fn(&T) -> Option<u64>,
) -> Vec<T> {
    let all_ids: HashSet<u64> = pending.iter().map(&id).collect();
    let mut placed: HashSet<u64> = HashSet::with_capacity(all_ids.len());
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let (ready, rest): (Vec<T>, Vec<T>) = pending.into_iter().partition(|item| {
            parent(item).map_or(true, |p| placed.contains(&p) || !all_ids.contains(&p))
        });
        pending = rest;

        if ready.is_empty() {
            ordered.append(&mut pending);
            break;
        }
        placed.extend(ready.iter().map(&id));
        ordered.extend(ready);
    }

    ordered
}

/// Inserts every record of a fixture, stopping at the first failure.
///
/// Returns the number of records inserted.
pub async fn load_fixture<S: DataStore + ?Sized>(
    store: &S,
    fixture: Fixture,
) -> StorageResult<usize> {
    let records = fixture.into_records();
    let count = records.len();

    for record in records {
        store.insert(record).await?;
    }

    info!(records = count, "fixture loaded");
    Ok(count)
}
