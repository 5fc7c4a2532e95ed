//! Quota-bounded blob storage for conversation persistence
//!
//! Thin adapter over the host's key-value persistence. Offers
//! single-key atomicity only; multi-key consistency is the
//! repository's responsibility. Every implementation enforces a byte
//! capacity: a `put` that would exceed it fails with a quota error and
//! is retriable after the caller frees space.

use crate::error::{CarelogError, Result};
use directories::ProjectDirs;
use sled::Db;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the on-disk data directory.
///
/// This makes it easy to point the binary at a test directory or
/// alternate location without changing the user's application data dir.
pub const DATA_DIR_ENV: &str = "CARELOG_DATA_DIR";

/// Byte-capacity usage statistics reported to collaborators
#[derive(Debug, Clone, Copy)]
pub struct StorageUsage {
    /// Bytes currently occupied by live entries
    pub used_bytes: u64,
    /// Configured maximum capacity in bytes
    pub capacity_bytes: u64,
    /// Percentage of capacity used (0.0-100.0)
    pub percentage_used: f64,
}

impl StorageUsage {
    /// Create usage statistics from raw counters
    ///
    /// # Examples
    ///
    /// ```
    /// use carelog::store::StorageUsage;
    ///
    /// let usage = StorageUsage::new(1024, 4096);
    /// assert_eq!(usage.percentage_used, 25.0);
    /// ```
    pub fn new(used_bytes: u64, capacity_bytes: u64) -> Self {
        let percentage_used = if capacity_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / capacity_bytes as f64) * 100.0
        };
        Self {
            used_bytes,
            capacity_bytes,
            percentage_used,
        }
    }
}

/// Key-value persistence contract consumed by the repository
///
/// `put` failing with a quota error must be retriable after the caller
/// frees space.
pub trait BlobStore {
    /// Read the bytes stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns `CarelogError::QuotaExceeded` when the write would push
    /// usage past the configured capacity, `CarelogError::Storage` for
    /// any other persistence failure.
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the entry under `key`; removing a missing key is not an error
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Bytes currently occupied by live entries (keys + values)
    fn usage_bytes(&self) -> u64;

    /// Configured maximum capacity in bytes
    fn capacity_bytes(&self) -> u64;

    /// Usage statistics snapshot
    fn usage(&self) -> StorageUsage {
        StorageUsage::new(self.usage_bytes(), self.capacity_bytes())
    }
}

/// Rejects a prospective write that would exceed the capacity.
///
/// `retained_bytes` is current usage minus the entry being replaced, so
/// overwriting a key only accounts for the size delta.
fn check_capacity(retained_bytes: u64, entry_bytes: u64, capacity_bytes: u64) -> Result<()> {
    if retained_bytes + entry_bytes > capacity_bytes {
        return Err(CarelogError::QuotaExceeded {
            needed: entry_bytes,
            available: capacity_bytes.saturating_sub(retained_bytes),
        }
        .into());
    }
    Ok(())
}

/// Persistent blob store backed by an embedded `sled` database
///
/// The store flushes after every mutation so a crash never loses an
/// acknowledged commit.
pub struct SledBlobStore {
    db: Db,
    capacity_bytes: u64,
}

impl SledBlobStore {
    /// Open or create a store at the default data directory
    ///
    /// Honors the `CARELOG_DATA_DIR` environment variable; otherwise
    /// resolves the platform data directory for the application.
    pub fn open_default(capacity_bytes: u64) -> Result<Self> {
        if let Ok(override_dir) = std::env::var(DATA_DIR_ENV) {
            return Self::open_at(PathBuf::from(override_dir).join("history"), capacity_bytes);
        }

        let proj_dirs = ProjectDirs::from("com", "carelog", "carelog")
            .ok_or_else(|| CarelogError::Storage("Could not determine data directory".into()))?;
        Self::open_at(proj_dirs.data_dir().join("history"), capacity_bytes)
    }

    /// Open or create a store at the specified path
    ///
    /// This is primarily useful for tests where the default application
    /// data directory is not desirable (for example, a temporary
    /// directory).
    pub fn open_at(path: impl AsRef<Path>, capacity_bytes: u64) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| CarelogError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db, capacity_bytes })
    }

    fn entry_size(&self, key: &str) -> u64 {
        match self.db.get(key.as_bytes()) {
            Ok(Some(value)) => (key.len() + value.len()) as u64,
            _ => 0,
        }
    }
}

impl BlobStore for SledBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| CarelogError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => Ok(Some(bytes.to_vec())),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let retained = self.usage_bytes().saturating_sub(self.entry_size(key));
        check_capacity(retained, (key.len() + bytes.len()) as u64, self.capacity_bytes)?;

        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| CarelogError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| CarelogError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| CarelogError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| CarelogError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn usage_bytes(&self) -> u64 {
        self.db
            .iter()
            .flatten()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }
}

/// In-memory blob store with the same quota semantics
///
/// Used by tests and as the reference implementation of the capacity
/// accounting; never persists anything.
#[derive(Debug)]
pub struct MemoryBlobStore {
    entries: HashMap<String, Vec<u8>>,
    capacity_bytes: u64,
}

impl MemoryBlobStore {
    /// Create an empty store with the given byte capacity
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            capacity_bytes,
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let existing = self
            .entries
            .get(key)
            .map(|v| (key.len() + v.len()) as u64)
            .unwrap_or(0);
        let retained = self.usage_bytes().saturating_sub(existing);
        check_capacity(retained, (key.len() + bytes.len()) as u64, self.capacity_bytes)?;

        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn usage_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }
}
