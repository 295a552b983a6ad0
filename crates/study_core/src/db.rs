use crate::filter::Favorites;
use crate::repository::{LocationRepository, decode_record, merge_documents};
use crate::schema::{DocumentId, StoredLocation};
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed document store. One JSON document per row.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection lock poisoned"))
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM study_locations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredLocation>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT doc_json FROM study_locations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(decode_record(id.to_string(), serde_json::from_str(&raw)?))),
            None => Ok(None),
        }
    }

    pub fn favorites(&self) -> Result<Favorites> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT location_id FROM favorites ORDER BY added_at")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.into_iter().collect())
    }

    /// Returns false when the id was already a favorite.
    pub fn add_favorite(&self, location_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO favorites (location_id) VALUES (?1)",
            params![location_id],
        )?;
        Ok(changed > 0)
    }

    /// Returns false when the id was not a favorite.
    pub fn remove_favorite(&self, location_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM favorites WHERE location_id = ?1",
            params![location_id],
        )?;
        Ok(changed > 0)
    }
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS study_locations (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          doc_json TEXT NOT NULL,
          inserted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
          updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE INDEX IF NOT EXISTS idx_study_locations_name ON study_locations(name);

        CREATE TABLE IF NOT EXISTS favorites (
          location_id TEXT PRIMARY KEY,
          added_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );
        "#,
    )?;
    Ok(())
}

fn document_name(document: &Value) -> &str {
    document
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

impl LocationRepository for SqliteStore {
    fn query_all(&self) -> Result<Vec<StoredLocation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, doc_json
            FROM study_locations
            ORDER BY inserted_at, rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for r in rows {
            let (id, raw) = r?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(document) => records.push(decode_record(id, document)),
                Err(err) => tracing::warn!(%id, error = %err, "skipping malformed document"),
            }
        }
        Ok(records)
    }

    fn upsert_merge(&self, id: &str, document: &Value) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT doc_json FROM study_locations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let merged = match existing {
            Some(raw) => {
                let mut stored: Value = serde_json::from_str(&raw)
                    .with_context(|| format!("stored document {id} is not valid JSON"))?;
                merge_documents(&mut stored, document);
                stored
            }
            None => document.clone(),
        };
        let merged_json = serde_json::to_string(&merged)?;

        tx.execute(
            r#"
            INSERT INTO study_locations (id, name, doc_json)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
              name=excluded.name,
              doc_json=excluded.doc_json,
              updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
            "#,
            params![id, document_name(&merged), merged_json],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn insert(&self, document: &Value) -> Result<DocumentId> {
        let conn = self.lock()?;
        let doc_json = serde_json::to_string(document)?;
        let id: String = conn.query_row(
            r#"
            INSERT INTO study_locations (id, name, doc_json)
            VALUES (lower(hex(randomblob(10))), ?1, ?2)
            RETURNING id
            "#,
            params![document_name(document), doc_json],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}
