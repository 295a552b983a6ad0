use crate::repository::LocationRepository;
use crate::schema::{DocumentId, StoredLocation, StudyLocation};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinSet;

/// What happens to comment dates when a catalog is written to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentTimestamps {
    /// Keep the date each comment carries in the catalog.
    #[default]
    Preserve,
    /// Stamp every comment with the time of the seeding run.
    SeedTime,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOptions {
    pub comment_timestamps: CommentTimestamps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedAction {
    Inserted(DocumentId),
    Merged(DocumentId),
}

#[derive(Debug, Clone)]
pub struct SeedFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub inserted: usize,
    pub merged: usize,
    pub failures: Vec<SeedFailure>,
}

impl SeedReport {
    pub fn attempted(&self) -> usize {
        self.inserted + self.merged + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Serialize a location for the store, applying the comment date policy.
pub fn to_document(
    location: &StudyLocation,
    comment_timestamps: CommentTimestamps,
    now: OffsetDateTime,
) -> Result<Value> {
    match comment_timestamps {
        CommentTimestamps::Preserve => Ok(serde_json::to_value(location)?),
        CommentTimestamps::SeedTime => {
            let mut stamped = location.clone();
            for comment in &mut stamped.comments {
                comment.date = Some(now);
            }
            Ok(serde_json::to_value(&stamped)?)
        }
    }
}

/// Map each name to the id of the last record carrying it.
pub fn index_by_name(records: &[StoredLocation]) -> HashMap<String, DocumentId> {
    let mut index = HashMap::new();
    for record in records {
        if let Some(previous) = index.insert(record.location.name.clone(), record.id.clone()) {
            tracing::warn!(
                name = %record.location.name,
                kept = %record.id,
                shadowed = %previous,
                "duplicate location name in store"
            );
        }
    }
    index
}

/// Upsert every catalog entry, keyed by name, and wait for all of them.
///
/// Upserts run concurrently and independently: a failed or panicked upsert
/// is logged and reported, never aborting the others. Only the initial
/// query can fail the whole run.
pub async fn seed<R>(
    repository: Arc<R>,
    catalog: Vec<StudyLocation>,
    options: SeedOptions,
) -> Result<SeedReport>
where
    R: LocationRepository + 'static,
{
    let existing = {
        let repository = Arc::clone(&repository);
        tokio::task::spawn_blocking(move || repository.query_all()).await??
    };
    let by_name = index_by_name(&existing);
    let now = OffsetDateTime::now_utc();

    tracing::info!(
        catalog = catalog.len(),
        existing = existing.len(),
        "seeding study locations"
    );

    let mut report = SeedReport::default();
    let mut set = JoinSet::new();
    let mut names = HashMap::new();

    for location in catalog {
        let name = location.name.clone();
        let document = match to_document(&location, options.comment_timestamps, now) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%name, error = %err, "could not serialize location");
                report.failures.push(SeedFailure {
                    name,
                    error: err.to_string(),
                });
                continue;
            }
        };
        let target = by_name.get(&name).cloned();
        let repository = Arc::clone(&repository);

        let handle = set.spawn_blocking(move || match target {
            Some(id) => repository
                .upsert_merge(&id, &document)
                .map(|()| SeedAction::Merged(id)),
            None => repository.insert(&document).map(SeedAction::Inserted),
        });
        names.insert(handle.id(), name);
    }

    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((task, Ok(action))) => {
                let name = names.remove(&task).unwrap_or_default();
                match action {
                    SeedAction::Inserted(id) => {
                        tracing::debug!(%name, %id, "document added");
                        report.inserted += 1;
                    }
                    SeedAction::Merged(id) => {
                        tracing::debug!(%name, %id, "document updated");
                        report.merged += 1;
                    }
                }
            }
            Ok((task, Err(err))) => {
                let name = names.remove(&task).unwrap_or_default();
                tracing::warn!(%name, error = %err, "upsert failed");
                report.failures.push(SeedFailure {
                    name,
                    error: format!("{err:#}"),
                });
            }
            Err(join_err) => {
                let name = names.remove(&join_err.id()).unwrap_or_default();
                tracing::warn!(%name, error = %join_err, "upsert task did not complete");
                report.failures.push(SeedFailure {
                    name,
                    error: join_err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        inserted = report.inserted,
        merged = report.merged,
        failed = report.failures.len(),
        "all sample data added"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Comment;
    use time::macros::datetime;

    fn with_comment() -> StudyLocation {
        StudyLocation {
            name: "Imperial College London - Abdus Salam Library".to_string(),
            comments: vec![Comment {
                name: "Alice".to_string(),
                content: "Great place to study!".to_string(),
                date: Some(datetime!(2024-03-01 10:00 UTC)),
            }],
            ..StudyLocation::default()
        }
    }

    #[test]
    fn preserve_keeps_comment_dates() {
        let now = datetime!(2026-01-01 00:00 UTC);
        let doc = to_document(&with_comment(), CommentTimestamps::Preserve, now).unwrap();
        assert_eq!(doc["comments"][0]["date"], "2024-03-01T10:00:00Z");
    }

    #[test]
    fn seed_time_restamps_comments() {
        let now = datetime!(2026-01-01 00:00 UTC);
        let doc = to_document(&with_comment(), CommentTimestamps::SeedTime, now).unwrap();
        assert_eq!(doc["comments"][0]["date"], "2026-01-01T00:00:00Z");
        assert_eq!(doc["comments"][0]["name"], "Alice");
    }

    #[test]
    fn last_duplicate_name_wins() {
        let record = |id: &str| StoredLocation {
            id: id.to_string(),
            location: StudyLocation {
                name: "Chelsea Library".to_string(),
                ..StudyLocation::default()
            },
        };
        let index = index_by_name(&[record("first"), record("second")]);
        assert_eq!(index.len(), 1);
        assert_eq!(index["Chelsea Library"], "second");
    }

    #[test]
    fn timestamp_policy_parses_kebab_case() {
        let policy: CommentTimestamps = serde_json::from_str("\"seed-time\"").unwrap();
        assert_eq!(policy, CommentTimestamps::SeedTime);
        assert_eq!(CommentTimestamps::default(), CommentTimestamps::Preserve);
    }
}
