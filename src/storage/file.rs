use super::{Store, StoreEvent, Subscribers};
use crate::errors;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, info};

lazy_static! {
    static ref KEY_REGEX: Regex = Regex::new(r#"^[A-Za-z0-9_-]+$"#).unwrap();
}

/// Directory-backed store keeping one `<key>.bin` file per key.
///
/// Several processes may share a directory. Each handle remembers the
/// contents it last saw so [`Store::sync`] can report the others' writes.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    subscribers: Subscribers,
    seen: Mutex<HashMap<String, Vec<u8>>>,
}

impl FileStore {
    /// Opens the store, creating `dir` if it does not exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, errors::Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            err!(Storage, "Failed to create data directory '{}'. {}", dir.display(), e)
        })?;
        let seen = scan(&dir)?;
        info!(path = %dir.display(), keys = seen.len(), "Opened store.");
        Ok(Self {
            dir,
            subscribers: Subscribers::default(),
            seen: Mutex::new(seen),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, errors::Error> {
        if !KEY_REGEX.is_match(key) {
            return Err(err!(
                Storage,
                "Store key ({}) must match regex {}.",
                key,
                KEY_REGEX.as_str()
            ));
        }
        Ok(self.dir.join(format!("{}.bin", key)))
    }

    fn seen(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, errors::Error> {
        self.seen
            .lock()
            .map_err(|e| err!(Storage, "Failed to lock store. {}", e))
    }
}

/// Reads every `<key>.bin` entry in `dir`.
fn scan(dir: &Path) -> Result<HashMap<String, Vec<u8>>, errors::Error> {
    let mut entries = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let key = match (path.file_stem().and_then(|s| s.to_str()), path.extension()) {
            (Some(stem), Some(ext)) if ext == "bin" && KEY_REGEX.is_match(stem) => stem.to_string(),
            _ => continue,
        };
        match fs::read(&path) {
            Ok(bytes) => {
                entries.insert(key, bytes);
            }
            // Removed between listing and reading.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(entries)
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, errors::Error> {
        match fs::read(self.path(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), errors::Error> {
        let path = self.path(key)?;
        // Written beside the target, then renamed into place.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value)?;
        tmp.flush()?;
        tmp.persist(&path)
            .map_err(|e| err!(Storage, "Failed to persist '{}'. {}", key, e.error))?;
        debug!(key, bytes = value.len(), "Wrote store entry.");

        self.seen()?.insert(key.to_string(), value.to_vec());
        self.subscribers
            .notify(StoreEvent::local(key, Some(value.to_vec())));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), errors::Error> {
        match fs::remove_file(self.path(key)?) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.seen()?.remove(key);
        self.subscribers.notify(StoreEvent::local(key, None));
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreEvent> {
        self.subscribers.subscribe()
    }

    fn sync(&self) -> Result<(), errors::Error> {
        let current = scan(&self.dir)?;
        let changes: Vec<StoreEvent> = {
            let mut seen = self.seen()?;
            let mut changes: Vec<StoreEvent> = current
                .iter()
                .filter(|(key, value)| seen.get(*key) != Some(*value))
                .map(|(key, value)| StoreEvent::external(key, Some(value.clone())))
                .collect();
            changes.extend(
                seen.keys()
                    .filter(|key| !current.contains_key(*key))
                    .map(|key| StoreEvent::external(key, None)),
            );
            *seen = current;
            changes
        };
        for event in changes {
            debug!(key = %event.key, removed = event.value.is_none(), "Store changed on disk.");
            self.subscribers.notify(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load, save, SAVED_QUERIES_KEY, TABLE_NAME_KEY, THEME_KEY};
    use tempfile::tempdir;

    #[test]
    fn test_put_get_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get(TABLE_NAME_KEY).unwrap(), None);
        store.put(TABLE_NAME_KEY, b"abc").unwrap();
        assert_eq!(store.get(TABLE_NAME_KEY).unwrap(), Some(b"abc".to_vec()));
        assert!(dir.path().join("qc-tableName.bin").exists());

        store.remove(TABLE_NAME_KEY).unwrap();
        assert_eq!(store.get(TABLE_NAME_KEY).unwrap(), None);
        store.remove(TABLE_NAME_KEY).unwrap();
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            save(&store, TABLE_NAME_KEY, &"orders".to_string()).unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(load(&store, TABLE_NAME_KEY, String::new()), "orders");
    }

    #[test]
    fn test_open_creates_nested_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();
        assert_eq!(store.dir(), nested.as_path());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let err = store.put("../escape", b"x").unwrap_err();
        assert_eq!(err.code(), 2000);
    }

    #[test]
    fn test_sync_reports_changes_from_another_handle() {
        let dir = tempdir().unwrap();
        let ours = FileStore::open(dir.path()).unwrap();
        ours.put(THEME_KEY, b"light").unwrap();
        let theirs = FileStore::open(dir.path()).unwrap();
        let rx = ours.subscribe();

        theirs.put(TABLE_NAME_KEY, b"orders").unwrap();
        theirs.remove(THEME_KEY).unwrap();
        ours.sync().unwrap();

        let mut events: Vec<StoreEvent> = rx.try_iter().collect();
        events.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(
            events,
            vec![
                StoreEvent::external(TABLE_NAME_KEY, Some(b"orders".to_vec())),
                StoreEvent::external(THEME_KEY, None),
            ]
        );

        ours.sync().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sync_ignores_own_writes() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let rx = store.subscribe();
        store.put(TABLE_NAME_KEY, b"orders").unwrap();
        store.sync().unwrap();

        let events: Vec<StoreEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![StoreEvent::local(TABLE_NAME_KEY, Some(b"orders".to_vec()))]);
    }

    #[test]
    fn test_put_notifies_subscribers() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let rx = store.subscribe();
        store.put(SAVED_QUERIES_KEY, b"x").unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.key, SAVED_QUERIES_KEY);
        assert_eq!(event.value, Some(b"x".to_vec()));
    }
}
