use std::{
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{error::StorageError, prelude::*};

/// Source of the current time for the expiration checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Cacheable value.
///
/// The tag is stored alongside the value, so that a value written as one type
/// is never silently read back as another one.
pub trait Payload: Serialize + DeserializeOwned {
    /// Type name and schema version, for example `product-code/1`.
    const TAG: &'static str;
}

#[derive(Clone, Serialize, Deserialize)]
struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,

    data: serde_json::Value,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Default, Serialize, Deserialize)]
struct Store {
    #[serde(default)]
    identity: String,

    #[serde(default)]
    entries: HashMap<String, Entry>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stats {
    pub total: usize,

    /// Expired but not yet purged.
    pub expired: usize,
}

/// Durable expiring key-value store of a single identity, for example an account.
///
/// The whole store is rewritten on every change.
pub struct Cache<C = SystemClock> {
    path: PathBuf,
    identity: String,
    clock: C,
    store: RwLock<Store>,
}

impl<C: Clock> Cache<C> {
    /// Open the identity's store in the directory, and purge the expired entries.
    ///
    /// Never fails: unreadable stores start empty, and unwritable ones keep working in memory.
    #[instrument(skip_all, fields(identity = identity))]
    pub fn open(dir: &Path, identity: &str, clock: C) -> Self {
        if let Err(error) = fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), "failed to create the cache directory: {error:#}");
        }
        let path = dir.join(file_name(identity));
        let store = load(&path, identity);
        debug!(path = %path.display(), n_entries = store.entries.len(), "opened the cache");
        let this =
            Self { path, identity: identity.to_string(), clock, store: RwLock::new(store) };
        if let Err(error) = this.clean_expired() {
            warn!("failed to persist the purged store: {:#}", Error::from(error));
        }
        this
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store the value, and persist the store before returning.
    ///
    /// The entry stays in memory even when persisting fails, so that the value
    /// is still served for the rest of the run.
    #[instrument(skip_all, fields(key = key, ttl = %ttl))]
    pub fn set<T: Payload>(&self, key: &str, value: &T, ttl: TimeDelta) -> Result<(), StorageError> {
        let data = serde_json::to_value(value)
            .map_err(|source| StorageError::Encode { key: key.to_string(), source })?;
        let cached_at = self.clock.now();
        let entry = Entry { tag: Some(T::TAG.to_string()), data, cached_at, expires_at: cached_at + ttl };

        let mut store = self.store.write();
        store.entries.insert(key.to_string(), entry);
        self.persist(&store)
    }

    /// Get the value unless it is absent or expired.
    pub fn get<T: Payload>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let store = self.store.read();
        let Some(entry) = store.entries.get(key) else {
            return Ok(None);
        };
        if self.clock.now() > entry.expires_at {
            debug!(key, "expired");
            return Ok(None);
        }
        if let Some(tag) = &entry.tag
            && tag != T::TAG
        {
            return Err(StorageError::TagMismatch {
                key: key.to_string(),
                expected: T::TAG,
                actual: tag.clone(),
            });
        }
        T::deserialize(&entry.data)
            .map(Some)
            .map_err(|source| StorageError::Decode { key: key.to_string(), source })
    }

    /// Remove the entry.
    ///
    /// # Returns
    ///
    /// Whether the entry existed.
    pub fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut store = self.store.write();
        if store.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&store)?;
        Ok(true)
    }

    /// Purge the expired entries, persisting only if anything was removed.
    ///
    /// # Returns
    ///
    /// Number of purged entries.
    pub fn clean_expired(&self) -> Result<usize, StorageError> {
        let now = self.clock.now();
        let mut store = self.store.write();
        let n_before = store.entries.len();
        store.entries.retain(|_, entry| entry.expires_at >= now);
        let n_purged = n_before - store.entries.len();
        if n_purged != 0 {
            info!(n_purged, "purged expired entries");
            self.persist(&store)?;
        }
        Ok(n_purged)
    }

    /// Remove all the entries of the identity.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut store = self.store.write();
        store.entries.clear();
        self.persist(&store)
    }

    pub fn stats(&self) -> Stats {
        let now = self.clock.now();
        let store = self.store.read();
        Stats {
            total: store.entries.len(),
            expired: store.entries.values().filter(|entry| now > entry.expires_at).count(),
        }
    }

    /// Purge the expired entries and release the cache.
    pub fn close(self) -> Result<(), StorageError> {
        self.clean_expired()?;
        debug!(path = %self.path.display(), "closed the cache");
        Ok(())
    }

    /// Overwrite the file via a temporary sibling.
    ///
    /// Called with the store lock held.
    fn persist(&self, store: &Store) -> Result<(), StorageError> {
        let contents = serde_json::to_vec_pretty(store)
            .map_err(|source| StorageError::Encode { key: self.identity.clone(), source })?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents).map_err(|source| StorageError::Io {
            operation: "write",
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| StorageError::Io {
            operation: "rename",
            path: self.path.clone(),
            source,
        })
    }
}

/// Make the identity safe to use in a file name.
pub fn sanitise(identity: &str) -> String {
    identity
        .chars()
        .take(32)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Readable and unique file name for the identity.
fn file_name(identity: &str) -> String {
    let digest = format!("{:x}", md5::compute(identity));
    format!("cache_{}-{}.json", sanitise(identity), &digest[..8])
}

fn load(path: &Path, identity: &str) -> Store {
    let empty = || Store { identity: identity.to_string(), entries: HashMap::new() };
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return empty(),
        Err(error) => {
            warn!(path = %path.display(), "failed to read the cache, starting cold: {error:#}");
            return empty();
        }
    };
    match serde_json::from_slice::<Store>(&contents) {
        Ok(store) if store.identity == identity => store,
        Ok(store) => {
            warn!(expected = identity, actual = %store.identity, "cache identity mismatch, starting cold");
            empty()
        }
        Err(error) => {
            warn!(path = %path.display(), "corrupted cache, starting cold: {error:#}");
            empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::TimeZone;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    use super::*;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Mutex::new(Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()))
        }

        fn advance(&self, delta: TimeDelta) {
            *self.0.lock() += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting(String);

    impl Payload for Greeting {
        const TAG: &'static str = "greeting/1";
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter(u32);

    impl Payload for Counter {
        const TAG: &'static str = "counter/1";
    }

    fn hello() -> Greeting {
        Greeting("hello".to_string())
    }

    #[test]
    fn test_ttl_boundary() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let cache = Cache::open(dir.path(), "A-1234ABCD", &clock);
        cache.set("greeting", &hello(), TimeDelta::seconds(1))?;

        clock.advance(TimeDelta::milliseconds(999));
        assert_eq!(cache.get::<Greeting>("greeting")?, Some(hello()));

        clock.advance(TimeDelta::milliseconds(2));
        assert_eq!(cache.get::<Greeting>("greeting")?, None);
        assert_eq!(cache.stats(), Stats { total: 1, expired: 1 });
        Ok(())
    }

    #[test]
    fn test_persisted_across_opens() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        Cache::open(dir.path(), "A-1234ABCD", &clock).set("greeting", &hello(), TimeDelta::hours(1))?;

        let cache = Cache::open(dir.path(), "A-1234ABCD", &clock);
        assert_eq!(cache.get::<Greeting>("greeting")?, Some(hello()));
        assert!(!cache.path().with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_identity_isolation() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let first = Cache::open(dir.path(), "A-1111", &clock);
        let second = Cache::open(dir.path(), "A-2222", &clock);
        first.set("key", &hello(), TimeDelta::hours(1))?;
        assert_eq!(second.get::<Greeting>("key")?, None);
        assert_ne!(first.path(), second.path());
        Ok(())
    }

    #[test]
    fn test_colliding_file_names() {
        // Both sanitise to `A_1`:
        assert_ne!(file_name("A/1"), file_name("A.1"));
    }

    #[test]
    fn test_foreign_document_is_ignored() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        cache.set("key", &hello(), TimeDelta::hours(1))?;
        let foreign_path = dir.path().join(file_name("A-2222"));
        fs::copy(cache.path(), &foreign_path)?;

        let foreign = Cache::open(dir.path(), "A-2222", &clock);
        assert_eq!(foreign.get::<Greeting>("key")?, None);
        Ok(())
    }

    #[test]
    fn test_corrupted_file_starts_cold() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        fs::write(dir.path().join(file_name("A-1111")), b"{\"entries\": {")?;
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        assert_eq!(cache.stats().total, 0);
        cache.set("key", &hello(), TimeDelta::hours(1))?;
        assert_eq!(cache.get::<Greeting>("key")?, Some(hello()));
        Ok(())
    }

    #[test]
    fn test_tag_mismatch() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        cache.set("key", &hello(), TimeDelta::hours(1))?;
        assert!(matches!(cache.get::<Counter>("key"), Err(StorageError::TagMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_decode_failure_is_error() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        // language=JSON
        let document = r#"
            {
                "identity": "A-1111",
                "entries": {
                    "key": {
                        "data": "not a number",
                        "cached_at": "2025-01-10T11:00:00Z",
                        "expires_at": "2025-01-10T13:00:00Z"
                    }
                }
            }
        "#;
        fs::write(dir.path().join(file_name("A-1111")), document)?;
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        assert!(matches!(cache.get::<Counter>("key"), Err(StorageError::Decode { .. })));
        Ok(())
    }

    #[test]
    fn test_clean_expired() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        cache.set("short", &Counter(1), TimeDelta::minutes(1))?;
        cache.set("long", &Counter(2), TimeDelta::hours(1))?;
        assert_eq!(cache.clean_expired()?, 0);

        clock.advance(TimeDelta::minutes(2));
        assert_eq!(cache.clean_expired()?, 1);
        assert_eq!(cache.stats(), Stats { total: 1, expired: 0 });

        // Purged entries stay purged on reopening:
        drop(cache);
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        assert_eq!(cache.get::<Counter>("long")?, Some(Counter(2)));
        assert_eq!(cache.stats().total, 1);
        Ok(())
    }

    #[test]
    fn test_open_purges_expired() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        Cache::open(dir.path(), "A-1111", &clock).set("key", &Counter(1), TimeDelta::minutes(1))?;
        clock.advance(TimeDelta::minutes(5));
        assert_eq!(Cache::open(dir.path(), "A-1111", &clock).stats().total, 0);
        Ok(())
    }

    #[test]
    fn test_unwritable_store_keeps_working_in_memory() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        cache.set("stale", &Counter(1), TimeDelta::minutes(1))?;

        // The rewrite goes through the temporary file, so a directory in its place breaks persisting:
        fs::create_dir(cache.path().with_extension("json.tmp"))?;
        clock.advance(TimeDelta::hours(1));

        let cache = Cache::open(dir.path(), "A-1111", &clock);
        assert_eq!(cache.stats().total, 0);
        assert!(cache.set("fresh", &Counter(2), TimeDelta::hours(1)).is_err());
        assert_eq!(cache.get::<Counter>("fresh")?, Some(Counter(2)));
        Ok(())
    }

    #[test]
    fn test_delete_and_clear() -> crate::prelude::Result {
        let dir = tempdir()?;
        let clock = ManualClock::new();
        let cache = Cache::open(dir.path(), "A-1111", &clock);
        cache.set("first", &Counter(1), TimeDelta::hours(1))?;
        cache.set("second", &Counter(2), TimeDelta::hours(1))?;
        assert!(cache.delete("first")?);
        assert!(!cache.delete("first")?);
        assert_eq!(cache.get::<Counter>("first")?, None);

        cache.clear()?;
        assert_eq!(cache.stats().total, 0);
        cache.close()?;
        assert_eq!(Cache::open(dir.path(), "A-1111", &clock).stats().total, 0);
        Ok(())
    }

    #[test]
    fn test_concurrent_access() -> crate::prelude::Result {
        let dir = tempdir()?;
        let cache = Cache::open(dir.path(), "A-1111", SystemClock);
        thread::scope(|scope| {
            for i in 0..8_u32 {
                let cache = &cache;
                scope.spawn(move || {
                    let key = format!("counter-{i}");
                    cache.set(&key, &Counter(i), TimeDelta::hours(1)).unwrap();
                    assert_eq!(cache.get::<Counter>(&key).unwrap(), Some(Counter(i)));
                });
            }
        });
        assert_eq!(cache.stats().total, 8);
        assert_eq!(Cache::open(dir.path(), "A-1111", SystemClock).stats().total, 8);
        Ok(())
    }
}
