// ABOUTME: SQLite document table holding fragment metadata records for the durable backend.
// ABOUTME: Rows keep their first-insertion sequence across upserts so listings stay in insertion order.

use std::path::Path;

use fragments_core::{FragmentListing, FragmentRecord};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use thiserror::Error;

/// Errors from the metadata table. These never leave the crate; the durable
/// backend converts them into `StorageError`.
#[derive(Debug, Error)]
pub(crate) enum MetadataError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Metadata documents keyed by `(owner_id, id)`, one JSON document per row.
pub(crate) struct SqliteMetadata {
    conn: Mutex<Connection>,
}

impl SqliteMetadata {
    /// Open or create the metadata database at `path` and ensure the schema.
    pub(crate) fn open(path: &Path) -> Result<Self, MetadataError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub(crate) fn open_in_memory() -> Result<Self, MetadataError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, MetadataError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS fragments (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                id TEXT NOT NULL,
                doc TEXT NOT NULL,
                UNIQUE (owner_id, id)
            );
            CREATE INDEX IF NOT EXISTS fragments_by_id ON fragments (id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace a record's document. An existing row keeps its seq.
    pub(crate) fn upsert(&self, record: &FragmentRecord) -> Result<(), MetadataError> {
        let doc = serde_json::to_string(record)?;
        self.conn.lock().execute(
            "INSERT INTO fragments (owner_id, id, doc) VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id, id) DO UPDATE SET doc = excluded.doc",
            params![record.owner_id, record.id, doc],
        )?;
        Ok(())
    }

    pub(crate) fn get(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<FragmentRecord>, MetadataError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT doc FROM fragments WHERE owner_id = ?1 AND id = ?2")?;

        let result = stmt.query_row(params![owner_id, id], |row| row.get::<_, String>(0));
        match result {
            Ok(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MetadataError::Sqlite(e)),
        }
    }

    /// List an owner's ids or records ordered by insertion sequence.
    pub(crate) fn list(
        &self,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentListing, MetadataError> {
        let conn = self.conn.lock();
        let column = if expand { "doc" } else { "id" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {column} FROM fragments WHERE owner_id = ?1 ORDER BY seq ASC"
        ))?;

        let rows = stmt.query_map(params![owner_id], |row| row.get::<_, String>(0))?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }

        if expand {
            let records = values
                .iter()
                .map(|doc| serde_json::from_str(doc))
                .collect::<Result<Vec<FragmentRecord>, _>>()?;
            Ok(FragmentListing::Records(records))
        } else {
            Ok(FragmentListing::Ids(values))
        }
    }

    pub(crate) fn delete(&self, owner_id: &str, id: &str) -> Result<(), MetadataError> {
        self.conn.lock().execute(
            "DELETE FROM fragments WHERE owner_id = ?1 AND id = ?2",
            params![owner_id, id],
        )?;
        Ok(())
    }

    /// The owner of the first row stored under `id`, if any.
    pub(crate) fn find_owner(&self, id: &str) -> Result<Option<String>, MetadataError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT owner_id FROM fragments WHERE id = ?1 LIMIT 1")?;

        match stmt.query_row(params![id], |row| row.get::<_, String>(0)) {
            Ok(owner_id) => Ok(Some(owner_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MetadataError::Sqlite(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(owner_id: &str, id: &str, size: u64) -> FragmentRecord {
        let now = Utc::now();
        FragmentRecord {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            created: now,
            updated: now,
            media_type: "text/markdown".to_string(),
            size,
        }
    }

    #[test]
    fn upsert_get_and_delete() {
        let meta = SqliteMetadata::open_in_memory().unwrap();
        let rec = record("owner", "one", 3);
        meta.upsert(&rec).unwrap();
        assert_eq!(meta.get("owner", "one").unwrap(), Some(rec.clone()));

        let mut changed = rec.clone();
        changed.size = 30;
        meta.upsert(&changed).unwrap();
        assert_eq!(meta.get("owner", "one").unwrap().unwrap().size, 30);

        meta.delete("owner", "one").unwrap();
        meta.delete("owner", "one").unwrap();
        assert_eq!(meta.get("owner", "one").unwrap(), None);
    }

    #[test]
    fn list_orders_by_first_insert() {
        let meta = SqliteMetadata::open_in_memory().unwrap();
        for id in ["z", "m", "a"] {
            meta.upsert(&record("owner", id, 0)).unwrap();
        }
        meta.upsert(&record("owner", "z", 1)).unwrap();
        meta.upsert(&record("other", "q", 0)).unwrap();

        let ids = meta.list("owner", false).unwrap();
        assert_eq!(ids, FragmentListing::Ids(vec!["z".into(), "m".into(), "a".into()]));

        let full = meta.list("owner", true).unwrap();
        assert_eq!(full.ids(), vec!["z", "m", "a"]);

        assert!(meta.list("nobody", true).unwrap().is_empty());
    }

    #[test]
    fn find_owner_looks_across_owners() {
        let meta = SqliteMetadata::open_in_memory().unwrap();
        meta.upsert(&record("alice", "shared", 0)).unwrap();
        meta.upsert(&record("bob", "own", 0)).unwrap();

        assert_eq!(meta.find_owner("shared").unwrap().as_deref(), Some("alice"));
        assert_eq!(meta.find_owner("own").unwrap().as_deref(), Some("bob"));
        assert_eq!(meta.find_owner("nothing").unwrap(), None);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fragments.db");
        let rec = record("owner", "persisted", 7);

        {
            let meta = SqliteMetadata::open(&path).unwrap();
            meta.upsert(&rec).unwrap();
        }

        let meta = SqliteMetadata::open(&path).unwrap();
        assert_eq!(meta.get("owner", "persisted").unwrap(), Some(rec));
    }

    #[test]
    fn corrupt_document_is_reported() {
        let meta = SqliteMetadata::open_in_memory().unwrap();
        meta.conn
            .lock()
            .execute(
                "INSERT INTO fragments (owner_id, id, doc) VALUES ('owner', 'bad', '{oops')",
                [],
            )
            .unwrap();
        assert!(matches!(meta.get("owner", "bad"), Err(MetadataError::Json(_))));
    }
}
