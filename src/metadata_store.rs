use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use redb::{Database, DatabaseError, ReadableTable, Table, TableDefinition};
use serde::{Deserialize, Serialize};
use spdlog::debug;

use crate::content::content_hash::ContentHash;
use crate::error::StoreError;

const STORE_VERSION: u32 = 1;
const VERSION_KEY: &str = "version";
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Post metadata keyed by post id, values are JSON encoded [`Metadata`].
const POSTS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> = TableDefinition::new("posts");
const META_TABLE: TableDefinition<'static, &'static str, u32> = TableDefinition::new("meta");

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Persisted provenance of a post. Timestamps only move when the content
/// hash changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What [`MetadataStore::reconcile`] did with a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Created,
    Updated,
    Unchanged,
}

/// Embedded single file store for post metadata.
///
/// The database file can only be opened by one process at a time. Every
/// read-modify-write happens inside one write transaction.
pub struct MetadataStore {
    path: PathBuf,
    db: Database,
}

impl MetadataStore {
    pub fn open(path: &Path, lock_timeout: Duration) -> Result<MetadataStore, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
            }
        }

        let db = Self::open_database(path, lock_timeout)?;
        let store = MetadataStore {
            path: path.to_path_buf(),
            db,
        };
        store.check_version()?;
        debug!("Opened metadata store {} with {} posts", path.display(), store.len());

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Result<Option<Metadata>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(POSTS_TABLE)?;
        Self::read_record(&table, id)
    }

    pub fn put(&self, id: &str, metadata: Metadata) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(POSTS_TABLE)?;
            Self::write_record(&mut table, id, &metadata)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Compares `hash` with the stored record for `id` and writes a new
    /// record only when they differ. Read and write share one transaction.
    pub fn reconcile(&self, id: &str, hash: ContentHash, now: DateTime<Utc>) -> Result<(Metadata, Reconciled), StoreError> {
        let txn = self.db.begin_write()?;
        let (metadata, outcome) = {
            let mut table = txn.open_table(POSTS_TABLE)?;
            let (metadata, outcome) = match Self::read_record(&table, id)? {
                Some(metadata) if metadata.hash == hash => (metadata, Reconciled::Unchanged),
                Some(metadata) => {
                    let updated = Metadata {
                        hash,
                        updated_at: now.max(metadata.created_at),
                        ..metadata
                    };
                    (updated, Reconciled::Updated)
                }
                None => {
                    let created = Metadata {
                        hash,
                        override_title: None,
                        created_at: now,
                        updated_at: now,
                    };
                    (created, Reconciled::Created)
                }
            };

            if outcome != Reconciled::Unchanged {
                Self::write_record(&mut table, id, &metadata)?;
            }
            (metadata, outcome)
        };

        if outcome == Reconciled::Unchanged {
            txn.abort()?;
        } else {
            txn.commit()?;
        }
        Ok((metadata, outcome))
    }

    /// Sets or clears the editorial title of a post that was already loaded
    /// once. Hash and timestamps are left untouched.
    pub fn set_override_title(&self, id: &str, title: Option<String>) -> Result<Metadata, StoreError> {
        let txn = self.db.begin_write()?;
        let metadata = {
            let mut table = txn.open_table(POSTS_TABLE)?;
            let mut metadata = Self::read_record(&table, id)?
                .ok_or_else(|| StoreError::UnknownPost(id.to_string()))?;

            metadata.override_title = title.filter(|t| !t.trim().is_empty());
            Self::write_record(&mut table, id, &metadata)?;
            metadata
        };
        txn.commit()?;
        Ok(metadata)
    }

    pub fn ids(&self) -> Result<Vec<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(POSTS_TABLE)?;
        let mut ids = vec![];
        for entry in table.iter()? {
            let (key, _) = entry?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.ids().map_or(0, |ids| ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_record<T>(table: &T, id: &str) -> Result<Option<Metadata>, StoreError>
        where
            T: ReadableTable<&'static str, &'static [u8]>,
    {
        let Some(value) = table.get(id)? else {
            return Ok(None);
        };
        let metadata = serde_json::from_slice(value.value())
            .map_err(|source| StoreError::Decode { id: id.to_string(), source })?;
        Ok(Some(metadata))
    }

    fn write_record(table: &mut Table<&'static str, &'static [u8]>, id: &str, metadata: &Metadata) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(metadata).map_err(StoreError::Encode)?;
        table.insert(id, bytes.as_slice())?;
        Ok(())
    }

    // Creates both tables on first use so readers never miss them.
    fn check_version(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            txn.open_table(POSTS_TABLE)?;
            let mut meta = txn.open_table(META_TABLE)?;
            let found = meta.get(VERSION_KEY)?.map(|v| v.value());
            match found {
                Some(version) if version != STORE_VERSION => {
                    return Err(StoreError::Version { path: self.path.clone(), found: version });
                }
                Some(_) => {}
                None => {
                    meta.insert(VERSION_KEY, STORE_VERSION)?;
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn open_database(path: &Path, timeout: Duration) -> Result<Database, StoreError> {
        let started = Instant::now();
        loop {
            match Database::create(path) {
                Ok(db) => return Ok(db),
                Err(DatabaseError::DatabaseAlreadyOpen) => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::LockTimeout { path: path.to_path_buf(), timeout });
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(StoreError::Database(e.into())),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(POSTS_TABLE)?;
            table.insert(id, bytes)?;
        }
        txn.commit()?;
        Ok(())
    }
}
