use anyhow::{Result, bail};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use study_core::catalog;
use study_core::db::SqliteStore;
use study_core::repository::LocationRepository;
use study_core::schema::{Category, DocumentId, StoredLocation, StudyLocation};
use study_core::seed::{CommentTimestamps, SeedOptions, seed};

fn store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open(dir.path().join("studyon.db")).unwrap())
}

fn location(name: &str, rating: f64) -> StudyLocation {
    StudyLocation {
        name: name.to_string(),
        rating,
        category: Category::Library,
        ..StudyLocation::default()
    }
}

#[tokio::test]
async fn reseeding_does_not_duplicate_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let sample = catalog::sample().unwrap();

    let first = seed(Arc::clone(&store), sample.clone(), SeedOptions::default())
        .await
        .unwrap();
    assert_eq!(first.inserted, sample.len());
    assert_eq!(first.merged, 0);
    assert!(first.is_clean());
    let count = store.count().unwrap();
    assert_eq!(count, sample.len());

    let second = seed(Arc::clone(&store), sample.clone(), SeedOptions::default())
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.merged, sample.len());
    assert_eq!(store.count().unwrap(), count);
}

#[tokio::test]
async fn reseeding_converges_on_catalog_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    seed(
        Arc::clone(&store),
        vec![location("Fulham Library", 2.0)],
        SeedOptions::default(),
    )
    .await
    .unwrap();
    seed(
        Arc::clone(&store),
        vec![location("Fulham Library", 4.0), location("Chelsea Library", 4.1)],
        SeedOptions::default(),
    )
    .await
    .unwrap();

    let mut records = store.query_all().unwrap();
    records.sort_by(|a, b| a.location.name.cmp(&b.location.name));
    let summary: Vec<_> = records
        .iter()
        .map(|r| (r.location.name.as_str(), r.location.rating))
        .collect();
    assert_eq!(summary, vec![("Chelsea Library", 4.1), ("Fulham Library", 4.0)]);
}

#[tokio::test]
async fn merge_keeps_fields_the_catalog_does_not_set() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let id = store
        .insert(&json!({ "name": "Acton Library", "rating": 1.0, "num": 4 }))
        .unwrap();

    let report = seed(
        Arc::clone(&store),
        vec![location("Acton Library", 3.6)],
        SeedOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.merged, 1);

    let record = store.get(&id).unwrap().unwrap();
    assert_eq!(record.location.rating, 3.6);

    let conn = rusqlite::Connection::open(dir.path().join("studyon.db")).unwrap();
    let raw: String = conn
        .query_row(
            "SELECT doc_json FROM study_locations WHERE id = ?1",
            [&id],
            |row| row.get(0),
        )
        .unwrap();
    let doc: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["num"], json!(4));
}

#[tokio::test]
async fn duplicate_names_in_store_merge_into_the_last_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let older = store.insert(&json!({ "name": "Paddington Library" })).unwrap();
    let newer = store.insert(&json!({ "name": "Paddington Library" })).unwrap();

    seed(
        Arc::clone(&store),
        vec![location("Paddington Library", 4.3)],
        SeedOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.get(&newer).unwrap().unwrap().location.rating, 4.3);
    assert_eq!(store.get(&older).unwrap().unwrap().location.rating, 0.0);
}

#[tokio::test]
async fn seed_time_policy_restamps_comments() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let imperial: Vec<_> = catalog::sample()
        .unwrap()
        .into_iter()
        .filter(|l| !l.comments.is_empty())
        .take(1)
        .collect();
    let original_date = imperial[0].comments[0].date.unwrap();

    seed(
        Arc::clone(&store),
        imperial.clone(),
        SeedOptions {
            comment_timestamps: CommentTimestamps::SeedTime,
        },
    )
    .await
    .unwrap();
    let stamped = &store.query_all().unwrap()[0];
    assert!(stamped.location.comments[0].date.unwrap() > original_date);

    seed(Arc::clone(&store), imperial, SeedOptions::default())
        .await
        .unwrap();
    let preserved = &store.query_all().unwrap()[0];
    assert_eq!(preserved.location.comments[0].date, Some(original_date));
}

#[tokio::test]
async fn loosely_typed_records_are_merged_not_duplicated() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store
        .insert(&json!({ "name": "Acton Library", "images": null, "rating": "4" }))
        .unwrap();
    store
        .insert(&json!({
            "name": "Chelsea Library",
            "comments": [{ "name": "A", "content": "x" }]
        }))
        .unwrap();

    let names: Vec<_> = store
        .query_all()
        .unwrap()
        .into_iter()
        .map(|r| r.location.name)
        .collect();
    assert_eq!(names, vec!["Acton Library", "Chelsea Library"]);

    let report = seed(
        Arc::clone(&store),
        vec![location("Acton Library", 3.6), location("Chelsea Library", 4.1)],
        SeedOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.merged, 2);
    assert_eq!(store.count().unwrap(), 2);

    let acton = &store.query_all().unwrap()[0];
    assert_eq!(acton.location.rating, 3.6);
}

/// Store wrapper that fails or panics for selected names.
struct Flaky {
    inner: SqliteStore,
}

impl Flaky {
    fn check(document: &Value) -> Result<()> {
        match document["name"].as_str() {
            Some("Broken Library") => bail!("simulated write failure"),
            Some("Panicking Library") => panic!("simulated crash"),
            _ => Ok(()),
        }
    }
}

impl LocationRepository for Flaky {
    fn query_all(&self) -> Result<Vec<StoredLocation>> {
        self.inner.query_all()
    }

    fn upsert_merge(&self, id: &str, document: &Value) -> Result<()> {
        Self::check(document)?;
        self.inner.upsert_merge(id, document)
    }

    fn insert(&self, document: &Value) -> Result<DocumentId> {
        Self::check(document)?;
        self.inner.insert(document)
    }
}

#[tokio::test]
async fn failures_do_not_abort_siblings() {
    let repository = Arc::new(Flaky {
        inner: SqliteStore::open_in_memory().unwrap(),
    });
    let catalog = vec![
        location("Chiswick Library", 4.4),
        location("Broken Library", 1.0),
        location("Panicking Library", 1.0),
        location("Maida Vale Library", 4.2),
    ];

    let report = seed(Arc::clone(&repository), catalog, SeedOptions::default())
        .await
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.attempted(), 4);
    let mut failed: Vec<_> = report.failures.iter().map(|f| f.name.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["Broken Library", "Panicking Library"]);
    assert!(report.failures.iter().any(|f| f.error.contains("simulated write failure")));
    assert_eq!(repository.inner.count().unwrap(), 2);
}

#[tokio::test]
async fn empty_catalog_is_a_no_op() {
    let repository = Arc::new(SqliteStore::open_in_memory().unwrap());
    let report = seed(Arc::clone(&repository), Vec::new(), SeedOptions::default())
        .await
        .unwrap();
    assert_eq!(report.attempted(), 0);
    assert_eq!(repository.count().unwrap(), 0);
}
