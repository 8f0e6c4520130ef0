//! Get-or-create-or-update primitive shared by every cascade step.

use serde_json::Value;

use crate::error::{ReconcileError, ReconcileResult};
use crate::netbox::{Collection, Query, Record, RecordStore};

/// What to do when a lookup matches more than one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Take the first match and log a warning
    #[default]
    First,
    /// Fail with [`ReconcileError::AmbiguousMatch`]
    Strict,
}

impl MatchPolicy {
    /// Maps the `strict_matching` switch to a policy
    #[must_use]
    pub const fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::First }
    }
}

/// What to do with a record that already exists
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpsertMode<'a> {
    /// Return it untouched
    KeepExisting,
    /// Patch it with the given fields
    Update(&'a Value),
}

/// Result of [`get_or_create`]
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// No match; the record was created
    Created(Record),
    /// Matched and left as is
    Found(Record),
    /// Matched and patched
    Updated(Record),
}

impl UpsertOutcome {
    /// The record, however it was obtained
    #[must_use]
    pub const fn record(&self) -> &Record {
        match self {
            Self::Created(r) | Self::Found(r) | Self::Updated(r) => r,
        }
    }

    /// Consumes the outcome and returns the record
    #[must_use]
    pub fn into_record(self) -> Record {
        match self {
            Self::Created(r) | Self::Found(r) | Self::Updated(r) => r,
        }
    }

    /// Identifier of the record
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.record().id
    }

    /// Short verb for logs
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Created(_) => "Created",
            Self::Found(_) => "Found existing",
            Self::Updated(_) => "Updated",
        }
    }
}

/// Looks a record up and creates or updates it.
///
/// One match is returned (patched first under [`UpsertMode::Update`]); no
/// match creates `payload`; several matches are resolved by `policy`.
///
/// # Errors
///
/// Returns an error if a store call fails, or if the lookup is ambiguous
/// under [`MatchPolicy::Strict`].
pub async fn get_or_create<S: RecordStore + ?Sized>(
    store: &S,
    collection: Collection,
    query: &Query,
    payload: &Value,
    mode: UpsertMode<'_>,
    policy: MatchPolicy,
) -> ReconcileResult<UpsertOutcome> {
    let mut matches = store.filter(collection, query).await?;

    if matches.len() > 1 {
        match policy {
            MatchPolicy::First => {
                tracing::warn!(
                    %collection,
                    %query,
                    count = matches.len(),
                    "Lookup matched several records, using the first"
                );
            }
            MatchPolicy::Strict => {
                return Err(ReconcileError::AmbiguousMatch {
                    collection: collection.path(),
                    count: matches.len(),
                    query: query.to_string(),
                });
            }
        }
    }

    if matches.is_empty() {
        let record = store.create(collection, payload).await?;
        tracing::debug!(%collection, id = record.id, %query, "Created record");
        return Ok(UpsertOutcome::Created(record));
    }

    let existing = matches.swap_remove(0);
    match mode {
        UpsertMode::KeepExisting => {
            tracing::debug!(%collection, id = existing.id, "Found existing record");
            Ok(UpsertOutcome::Found(existing))
        }
        UpsertMode::Update(fields) => {
            let record = store.patch(collection, existing.id, fields).await?;
            tracing::debug!(%collection, id = record.id, "Updated record");
            Ok(UpsertOutcome::Updated(record))
        }
    }
}
