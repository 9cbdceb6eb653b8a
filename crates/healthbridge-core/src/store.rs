//! Local durable storage: a hot cache (DashMap) in front of a Sled DB.
//!
//! Records are JSON text under a logical name (`profile`, `readings`) plus a key
//! prefix. Absent or corrupt records fall back to a caller-supplied default.

use crate::error::{StoreError, StoreResult};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_DB_DIR: &str = "healthbridge_store";

/// Logical records kept in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    Profile,
    Readings,
}

impl RecordKey {
    pub fn name(&self) -> &'static str {
        match self {
            RecordKey::Profile => "profile",
            RecordKey::Readings => "readings",
        }
    }
}

/// Raw byte storage behind [`PersistentStore`].
pub trait KeyValueBackend: Send + Sync {
    fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
    fn put_raw(&self, key: &str, value: &[u8]) -> StoreResult<()>;
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Sled-backed storage with an in-memory read cache.
pub struct SledBackend {
    db: Db,
    /// Hot cache: key -> value. Checked before Sled.
    cache: DashMap<String, Vec<u8>>,
}

impl SledBackend {
    /// Opens or creates the database under `storage_dir/healthbridge_store`.
    pub fn open_in<P: AsRef<Path>>(storage_dir: P) -> StoreResult<Self> {
        Self::open_path(storage_dir.as_ref().join(DEFAULT_DB_DIR))
    }

    /// Opens or creates a Sled database at exactly `path`.
    pub fn open_path<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            cache: DashMap::new(),
        })
    }
}

impl KeyValueBackend for SledBackend {
    fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if let Some(v) = self.cache.get(key) {
            return Ok(Some(v.clone()));
        }
        let out = self.db.get(key.as_bytes())?.map(|iv| iv.to_vec());
        if let Some(ref vec) = out {
            self.cache.insert(key.to_string(), vec.clone());
        }
        Ok(out)
    }

    fn put_raw(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.db.insert(key.as_bytes(), value)?;
        self.cache.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Volatile storage. Used by tests and `storage_backend = "memory"`.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get_raw(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    fn put_raw(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Typed JSON records over a [`KeyValueBackend`].
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueBackend>,
    prefix: String,
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// In-memory store with the default `hb_` prefix.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), "hb_")
    }

    /// Physical key for a logical record (e.g. `hb_profile`).
    pub fn physical_key(&self, key: RecordKey) -> String {
        format!("{}{}", self.prefix, key.name())
    }

    /// `Ok(None)` when absent; `Err(Parse)` when present but malformed.
    pub fn try_load<T: DeserializeOwned>(&self, key: RecordKey) -> StoreResult<Option<T>> {
        let pk = self.physical_key(key);
        let Some(bytes) = self.backend.get_raw(&pk)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Parse { key: pk, source })
    }

    /// Load a record, substituting `default` for absent or unreadable data.
    /// Corruption is logged and otherwise silent; the bad value is left in place
    /// until the next save overwrites it.
    pub fn load_or<T: DeserializeOwned>(&self, key: RecordKey, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(v)) => v,
            Ok(None) => {
                debug!(record = key.name(), "no stored record; using default");
                default
            }
            Err(e) => {
                warn!(record = key.name(), error = %e, "discarding unreadable stored record");
                default
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: RecordKey, value: &T) -> StoreResult<()> {
        let pk = self.physical_key(key);
        let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Serialize {
            key: pk.clone(),
            source,
        })?;
        self.backend.put_raw(&pk, &bytes)
    }

    /// Write raw bytes under a logical record. Only useful for seeding corrupt data in tests
    /// and for importing records written by other clients.
    pub fn put_raw(&self, key: RecordKey, bytes: &[u8]) -> StoreResult<()> {
        self.backend.put_raw(&self.physical_key(key), bytes)
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.backend.flush()
    }
}
