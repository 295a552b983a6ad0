use crate::schema::{DocumentId, StoredLocation, StudyLocation};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Document store holding the `study_locations` collection.
///
/// Implementations must be shareable across threads: the seeder issues
/// upserts from concurrent blocking tasks.
pub trait LocationRepository: Send + Sync {
    /// Every readable record in store order.
    fn query_all(&self) -> Result<Vec<StoredLocation>>;

    /// Merge `document` into the record `id`, creating it when absent.
    fn upsert_merge(&self, id: &str, document: &Value) -> Result<()>;

    /// Create a record and return the id the store assigned to it.
    fn insert(&self, document: &Value) -> Result<DocumentId>;
}

/// Decode a stored document. Missing fields take defaults, and a field
/// whose value has the wrong shape is treated as absent so the rest of the
/// record still reads.
pub fn decode_record(id: DocumentId, document: Value) -> StoredLocation {
    if let Ok(location) = StudyLocation::deserialize(&document) {
        return StoredLocation { id, location };
    }
    let Value::Object(fields) = document else {
        tracing::warn!(%id, "study location document is not an object");
        return StoredLocation {
            id,
            location: StudyLocation::default(),
        };
    };

    // Fields are independent, so each one is checked on its own.
    let readable: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, value)| {
            let single = Map::from_iter([(key.clone(), value.clone())]);
            let ok = StudyLocation::deserialize(&Value::Object(single)).is_ok();
            if !ok {
                tracing::warn!(%id, field = %key, "ignoring unreadable field");
            }
            ok
        })
        .collect();
    let location = StudyLocation::deserialize(&Value::Object(readable)).unwrap_or_default();
    StoredLocation { id, location }
}

/// Merge `incoming` into `target`: objects merge key by key, anything
/// else is replaced. Keys only present in `target` survive.
pub fn merge_documents(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(update)) => {
            for (key, value) in update {
                match existing.get_mut(key) {
                    Some(slot) => merge_documents(slot, value),
                    None => {
                        existing.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
