use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use super::{RecordStore, StoreError, UpdateOutcome};
use crate::core::records::{Record, RecordId};
use crate::platform::{NativePlatform, Platform};

/// Collection names become table names, so only plain identifiers pass.
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// JSON documents in one SQLite table per collection. The connection is
/// opened on first use and shared for the life of the store.
pub struct SqliteRecordStore {
    path: PathBuf,
    database: String,
    collection: String,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl SqliteRecordStore {
    pub fn new(
        path: impl Into<PathBuf>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let collection = collection.into();
        if !is_valid_collection_name(&collection) {
            return Err(StoreError::InvalidCollection(collection));
        }
        Ok(Self {
            path: path.into(),
            database: database.into(),
            collection,
            conn: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    async fn connection(&self) -> Result<&Arc<Mutex<Connection>>, StoreError> {
        self.conn.get_or_try_init(|| async { self.open() }).await
    }

    fn open(&self) -> Result<Arc<Mutex<Connection>>, StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
            NativePlatform::restrict_dir_permissions(parent);
        }

        let conn = Connection::open(&self.path)?;
        NativePlatform::restrict_file_permissions(&self.path);
        conn.busy_timeout(Duration::from_secs(5))?;
        create_collection(&conn, &self.collection)?;

        info!(
            "Connected to record store {} at {}",
            self.database,
            self.path.display()
        );
        Ok(Arc::new(Mutex::new(conn)))
    }

    /// Create the collection table and its indexes, dropping it first when asked.
    pub async fn initialize(&self, drop_existing: bool) -> Result<(), StoreError> {
        let conn = self.connection().await?.lock().await;
        if drop_existing {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", self.collection))?;
            info!("Dropped collection '{}'", self.collection);
        }
        create_collection(&conn, &self.collection)?;
        Ok(())
    }

    pub async fn insert_one(&self, record: &Record) -> Result<(), StoreError> {
        let document = serde_json::to_string(record)?;
        let conn = self.connection().await?.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, document) VALUES (?1, ?2)",
                self.collection
            ),
            params![record.id.to_hex(), document],
        )?;
        Ok(())
    }
}

fn create_collection(conn: &Connection, collection: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {c} (
            id TEXT PRIMARY KEY,
            document TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_{c}_task_id
            ON {c}(json_extract(document, '$.task_id'));
        CREATE INDEX IF NOT EXISTS idx_{c}_created_date
            ON {c}(json_extract(document, '$.created_date') DESC);
        CREATE INDEX IF NOT EXISTS idx_{c}_client_email
            ON {c}(json_extract(document, '$.client_email_address'));",
        c = collection
    ))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn find_one(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        let conn = self.connection().await?.lock().await;
        let document: Option<String> = conn
            .query_row(
                &format!("SELECT document FROM {} WHERE id = ?1", self.collection),
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(document
            .map(|doc| serde_json::from_str(&doc))
            .transpose()?)
    }

    async fn exists(&self, id: &RecordId) -> Result<bool, StoreError> {
        let conn = self.connection().await?.lock().await;
        let found: Option<i64> = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", self.collection),
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn update_one(
        &self,
        id: &RecordId,
        fields: Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut conn = self.connection().await?.lock().await;
        let tx = conn.transaction()?;

        let current: Option<String> = tx
            .query_row(
                &format!("SELECT document FROM {} WHERE id = ?1", self.collection),
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Ok(UpdateOutcome::default());
        };

        let mut document: Map<String, Value> = serde_json::from_str(&current)?;
        let mut modified = false;
        for (key, value) in fields {
            if key == "_id" {
                debug!(record = %id, "Ignoring attempt to overwrite _id");
                continue;
            }
            if document.get(&key) != Some(&value) {
                document.insert(key, value);
                modified = true;
            }
        }

        if modified {
            tx.execute(
                &format!(
                    "UPDATE {} SET document = ?1 WHERE id = ?2",
                    self.collection
                ),
                params![serde_json::to_string(&document)?, id.to_hex()],
            )?;
            tx.commit()?;
        }

        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.connection().await?.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
