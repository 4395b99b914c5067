use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use thiserror::Error;
use time::OffsetDateTime;

use crate::config::StorageOptions;
use crate::model::Recipe;

mod schema;

/// The single key the whole recipe collection lives under.
pub const RECIPES_KEY: &str = "Recipes";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serializing recipe collection: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("creating data directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key-value storage, one value per key.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the value under `key`. Readers observe either the previous
    /// value or the new one, never a partial write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Reads and writes the entire recipe collection as one JSON array under
/// [`RECIPES_KEY`].
#[derive(Clone)]
pub struct RecipeStore {
    backend: Arc<dyn KeyValueStore>,
}

impl RecipeStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns the persisted collection, or `None` when nothing was stored or
    /// the stored blob does not parse. Failures of the backend itself are
    /// returned as errors.
    pub fn load(&self) -> Result<Option<Vec<Recipe>>, StoreError> {
        let Some(raw) = self.backend.get_item(RECIPES_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Recipe>>(&raw) {
            Ok(recipes) => Ok(Some(recipes)),
            Err(err) => {
                tracing::warn!(
                    %err,
                    bytes = raw.len(),
                    "stored recipe collection is malformed, ignoring it"
                );
                Ok(None)
            }
        }
    }

    pub fn save(&self, recipes: &[Recipe]) -> Result<(), StoreError> {
        let json = serde_json::to_string(recipes)?;
        self.backend.set_item(RECIPES_KEY, &json)?;
        tracing::debug!(
            count = recipes.len(),
            bytes = json.len(),
            "persisted recipe collection"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteKeyValueStore {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteKeyValueStore {
    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self.connect()?;
        f(&mut conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            tx.commit()?;
            Ok(())
        })
    }
}

/// In-process store. Used as a test double and for throwaway catalogs;
/// `set_fail_writes(true)` makes every write fail.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.items.lock().insert(key.to_owned(), value.into());
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("writes to '{key}' are disabled")));
        }
        self.items.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

pub fn init(options: &StorageOptions) -> Result<SqliteKeyValueStore, StoreError> {
    let db_path = &options.database_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let conn = Connection::open(db_path)?;
    prepare_connection(&conn, options)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "opened recipe database");
    Ok(SqliteKeyValueStore {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(options.clone()),
    })
}

fn prepare_connection(conn: &Connection, options: &StorageOptions) -> Result<(), StoreError> {
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        options.wal_autocheckpoint.to_string(),
    )?;
    Ok(())
}
