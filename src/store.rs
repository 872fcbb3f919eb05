//! File-backed persistence for guild documents and config files.
//!
//! Every document is a single JSON file written atomically (temp file, fsync,
//! rename) with the previous contents copied to a `.backup` beside it. Reads
//! go through a TTL cache and always return defensive clones; callers that
//! mutate must hold the guild lock for the whole read-modify-write cycle.
//! I/O failures degrade (empty document on read, `false` on write) instead of
//! propagating into callers.

use crate::models::GuildLedger;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{fs, io::Write as _};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// How long a cached guild document stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    document: GuildLedger,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < CACHE_TTL
    }
}

/// Central data store: one JSON document per guild plus config/response files.
///
/// Constructed once at startup and shared behind an `Arc`; tests build fresh
/// instances over temporary directories.
pub struct DataStore {
    guilds_dir: PathBuf,
    config_dir: PathBuf,
    responses_dir: PathBuf,
    cache: RwLock<HashMap<u64, CacheEntry>>,
    locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl DataStore {
    /// Open the store rooted at `data_dir`, creating the directory layout.
    pub fn new(data_dir: &Path) -> crate::errors::Result<Self> {
        let guilds_dir = data_dir.join("guilds");
        let config_dir = data_dir.join("config");
        let responses_dir = data_dir.join("responses");
        for dir in [&guilds_dir, &config_dir, &responses_dir] {
            fs::create_dir_all(dir)?;
        }
        info!("Data store initialized at {}", data_dir.display());
        Ok(DataStore {
            guilds_dir,
            config_dir,
            responses_dir,
            cache: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Mutual-exclusion lock for one guild. Hold it across the whole
    /// read-modify-write cycle; the store itself only guarantees atomic
    /// single writes.
    pub async fn guild_lock(&self, guild_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(guild_id).or_default())
    }

    fn guild_path(&self, guild_id: u64) -> PathBuf {
        self.guilds_dir.join(format!("{guild_id}.json"))
    }

    /// Path of a file under `config/`.
    pub fn config_path(&self, file_name: &str) -> PathBuf {
        self.config_dir.join(file_name)
    }

    /// Directory holding the response packs.
    pub fn responses_dir(&self) -> &Path {
        &self.responses_dir
    }

    /// Load a guild document, served from cache while fresh.
    pub async fn load_guild(&self, guild_id: u64) -> GuildLedger {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&guild_id) {
                if entry.is_fresh() {
                    return entry.document.clone();
                }
            }
        }
        self.load_guild_fresh(guild_id).await
    }

    /// Load a guild document from disk, bypassing the cache. Used under the
    /// guild lock so mutations never start from a stale snapshot.
    pub async fn load_guild_fresh(&self, guild_id: u64) -> GuildLedger {
        let document: GuildLedger = read_json_or_default(&self.guild_path(guild_id));
        let mut cache = self.cache.write().await;
        cache.insert(
            guild_id,
            CacheEntry {
                document: document.clone(),
                fetched_at: Instant::now(),
            },
        );
        document
    }

    /// Persist a guild document. Returns `false` (after logging) on failure;
    /// the cache is refreshed either way so subsequent reads within the lock
    /// see the attempted state.
    pub async fn save_guild(&self, guild_id: u64, document: &GuildLedger) -> bool {
        {
            let mut cache = self.cache.write().await;
            cache.insert(
                guild_id,
                CacheEntry {
                    document: document.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        write_json_atomic(&self.guild_path(guild_id), document)
    }

    /// Drop the cached copy of one guild document.
    pub async fn invalidate(&self, guild_id: u64) {
        let mut cache = self.cache.write().await;
        if cache.remove(&guild_id).is_some() {
            debug!("Invalidated cache for guild {guild_id}");
        }
    }

    /// Drop every cached guild document.
    pub async fn flush_cache(&self) {
        let mut cache = self.cache.write().await;
        let dropped = cache.len();
        cache.clear();
        info!("Flushed {dropped} cached guild documents");
    }
}

/// Read a JSON file, falling back to its `.backup` on decode failure and to
/// `T::default()` when neither is usable. Never returns an error.
pub fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!("JSON decode error in {}: {e}", path.display());
                read_backup_or_default(path)
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("File not found: {}", path.display());
            T::default()
        }
        Err(e) => {
            error!("Error reading {}: {e}", path.display());
            T::default()
        }
    }
}

fn read_backup_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let backup = backup_path(path);
    match fs::read_to_string(&backup) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => {
                info!("Restored {} from backup", path.display());
                value
            }
            Err(e) => {
                error!("Backup restore failed for {}: {e}", path.display());
                T::default()
            }
        },
        Err(e) => {
            error!("Backup unavailable for {}: {e}", path.display());
            T::default()
        }
    }
}

/// Atomically replace `path` with the JSON encoding of `value`.
///
/// The existing file is first copied to `{path}.backup`, then the new
/// contents are written to a temp file, fsynced, and renamed over the target.
/// Returns `false` after logging on any failure.
pub fn write_json_atomic<T>(path: &Path, value: &T) -> bool
where
    T: Serialize,
{
    if path.exists() {
        if let Err(e) = fs::copy(path, backup_path(path)) {
            warn!("Error creating backup for {}: {e}", path.display());
        }
    }

    let tmp = path.with_extension("json.tmp");
    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        let encoded = serde_json::to_vec_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            debug!("Saved {}", path.display());
            true
        }
        Err(e) => {
            error!("Error saving {}: {e}", path.display());
            // Best-effort cleanup of the temp file.
            let _ = fs::remove_file(&tmp);
            false
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".backup");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::UserAccount;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> DataStore {
        DataStore::new(dir.path()).unwrap()
    }

    fn sample_document() -> GuildLedger {
        let mut doc = GuildLedger::default();
        doc.entry(101, "Alice", 50).pockets = 10;
        doc.entry(202, "Bob", 50).savings = 75;
        doc
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let doc = sample_document();

        assert!(store.save_guild(1, &doc).await);
        let loaded = store.load_guild(1).await;
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn missing_guild_loads_as_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let loaded = store.load_guild(999).await;
        assert!(loaded.accounts.is_empty());
    }

    #[tokio::test]
    async fn reads_return_defensive_copies() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_guild(1, &sample_document()).await;

        let mut copy = store.load_guild(1).await;
        copy.entry(101, "Alice", 50).pockets = 999_999;

        // The cached document must be unaffected by the caller's mutation.
        let reread = store.load_guild(1).await;
        assert_eq!(reread.account(101).unwrap().pockets, 10);
    }

    #[tokio::test]
    async fn cached_read_survives_external_file_change_until_fresh_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_guild(1, &sample_document()).await;
        let _ = store.load_guild(1).await;

        // Simulate an out-of-band change on disk.
        let mut changed = sample_document();
        changed.entry(101, "Alice", 50).pockets = 42;
        let path = dir.path().join("guilds").join("1.json");
        fs::write(&path, serde_json::to_vec(&changed).unwrap()).unwrap();

        let cached = store.load_guild(1).await;
        assert_eq!(cached.account(101).unwrap().pockets, 10);

        let fresh = store.load_guild_fresh(1).await;
        assert_eq!(fresh.account(101).unwrap().pockets, 42);
    }

    #[tokio::test]
    async fn invalidate_forces_a_disk_read() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_guild(1, &sample_document()).await;

        let mut changed = sample_document();
        changed.entry(101, "Alice", 50).pockets = 42;
        let path = dir.path().join("guilds").join("1.json");
        fs::write(&path, serde_json::to_vec(&changed).unwrap()).unwrap();

        store.invalidate(1).await;
        let loaded = store.load_guild(1).await;
        assert_eq!(loaded.account(101).unwrap().pockets, 42);
    }

    #[tokio::test]
    async fn corrupted_primary_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let doc = sample_document();

        // Two saves so the backup holds a valid prior copy.
        assert!(store.save_guild(1, &doc).await);
        assert!(store.save_guild(1, &doc).await);

        let path = dir.path().join("guilds").join("1.json");
        fs::write(&path, b"{ not json at all").unwrap();
        store.flush_cache().await;

        let recovered = store.load_guild(1).await;
        assert_eq!(recovered, doc);
    }

    #[tokio::test]
    async fn corrupted_primary_without_backup_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let path = dir.path().join("guilds").join("1.json");
        fs::write(&path, b"garbage").unwrap();

        let loaded = store.load_guild(1).await;
        assert!(loaded.accounts.is_empty());
    }

    #[test]
    fn backup_path_appends_suffix() {
        let path = Path::new("/tmp/data/guilds/5.json");
        assert_eq!(
            backup_path(path),
            PathBuf::from("/tmp/data/guilds/5.json.backup")
        );
    }

    #[test]
    fn write_json_atomic_creates_backup_of_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut first = GuildLedger::default();
        first.accounts.insert(
            "1".to_string(),
            UserAccount::new(1, "first", 50),
        );
        let mut second = GuildLedger::default();
        second.accounts.insert(
            "2".to_string(),
            UserAccount::new(2, "second", 50),
        );
        assert!(write_json_atomic(&path, &first));
        assert!(write_json_atomic(&path, &second));

        let backup: GuildLedger = read_json_or_default(&backup_path(&path));
        assert_eq!(backup, first);
        let current: GuildLedger = read_json_or_default(&path);
        assert_eq!(current, second);
    }
}
