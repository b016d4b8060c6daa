//! Key-value persistence for builder state and saved queries.
//!
//! Values are bincode-encoded. Readers that cannot decode a stored value fall
//! back to a default instead of failing, so a corrupt entry never blocks the
//! builder.

pub mod file;
pub mod memory;

use crate::errors;
use bincode::{config, Decode, Encode};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use tracing::{debug, warn};

pub use file::FileStore;
pub use memory::MemoryStore;

pub const TABLE_NAME_KEY: &str = "qc-tableName";
pub const COLUMNS_KEY: &str = "qc-columns";
pub const QUERY_TYPE_KEY: &str = "qc-queryType";
pub const SAVED_QUERIES_KEY: &str = "qc-savedQueries";
pub const THEME_KEY: &str = "theme";

/// Change notification broadcast after a successful write or removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    pub key: String,
    /// New encoded value, `None` when the key was removed.
    pub value: Option<Vec<u8>>,
    /// Set when the change was made outside this store handle.
    pub external: bool,
}

impl StoreEvent {
    pub fn local(key: &str, value: Option<Vec<u8>>) -> Self {
        Self {
            key: key.to_string(),
            value,
            external: false,
        }
    }

    pub fn external(key: &str, value: Option<Vec<u8>>) -> Self {
        Self {
            key: key.to_string(),
            value,
            external: true,
        }
    }
}

/// A key-value store port.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, errors::Error>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), errors::Error>;
    fn remove(&self, key: &str) -> Result<(), errors::Error>;
    /// Returns a channel receiving every later change to the store.
    fn subscribe(&self) -> Receiver<StoreEvent>;
    /// Picks up changes made by other processes and notifies subscribers.
    fn sync(&self) -> Result<(), errors::Error> {
        Ok(())
    }
}

/// Fan-out list of change subscribers shared by the store implementations.
#[derive(Debug, Default)]
pub struct Subscribers {
    senders: Mutex<Vec<Sender<StoreEvent>>>,
}

impl Subscribers {
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(tx),
            Err(e) => warn!("Failed to register store subscriber. {}", e),
        }
        rx
    }

    /// Sends `event` to every live subscriber, dropping disconnected ones.
    pub fn notify(&self, event: StoreEvent) {
        match self.senders.lock() {
            Ok(mut senders) => {
                senders.retain(|tx| tx.send(event.clone()).is_ok());
                debug!(key = %event.key, subscribers = senders.len(), "Store changed.");
            }
            Err(e) => warn!(key = %event.key, "Failed to notify store subscribers. {}", e),
        }
    }
}

/// Decodes a stored value.
pub fn decode<T: Decode<()>>(bytes: &[u8]) -> Result<T, errors::Error> {
    let (value, _) = bincode::decode_from_slice(bytes, config::standard())?;
    Ok(value)
}

/// Encodes a value for storage.
pub fn encode<T: Encode>(value: &T) -> Result<Vec<u8>, errors::Error> {
    Ok(bincode::encode_to_vec(value, config::standard())?)
}

/// Loads the value under `key`, or `default` when missing or unreadable.
pub fn load<T: Decode<()>>(store: &dyn Store, key: &str, default: T) -> T {
    match store.get(key) {
        Ok(Some(bytes)) => match decode(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Error reading stored value, using default. {}", e);
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            warn!(key, "Error reading store, using default. {}", e);
            default
        }
    }
}

/// Encodes `value` and writes it under `key`.
pub fn save<T: Encode>(store: &dyn Store, key: &str, value: &T) -> Result<(), errors::Error> {
    store.put(key, &encode(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDefinition, DataType, QueryType};

    #[test]
    fn test_load_missing_key_returns_default() {
        let store = MemoryStore::new();
        assert_eq!(load(&store, TABLE_NAME_KEY, "my_table".to_string()), "my_table");
    }

    #[test]
    fn test_save_and_load_typed_values() {
        let store = MemoryStore::new();
        let columns = vec![ColumnDefinition::new("id", DataType::Int).with_sample("1")];
        save(&store, COLUMNS_KEY, &columns).unwrap();
        save(&store, QUERY_TYPE_KEY, &QueryType::Delete).unwrap();

        let loaded: Vec<ColumnDefinition> = load(&store, COLUMNS_KEY, Vec::new());
        assert_eq!(loaded, columns);
        assert_eq!(load(&store, QUERY_TYPE_KEY, QueryType::Select), QueryType::Delete);
    }

    #[test]
    fn test_undecodable_value_falls_back_to_default() {
        let store = MemoryStore::new();
        store.put(QUERY_TYPE_KEY, &[0xff, 0xff, 0xff]).unwrap();
        assert_eq!(load(&store, QUERY_TYPE_KEY, QueryType::Select), QueryType::Select);
    }

    #[test]
    fn test_subscribers_receive_changes() {
        let store = MemoryStore::new();
        let rx = store.subscribe();
        save(&store, TABLE_NAME_KEY, &"orders".to_string()).unwrap();
        store.remove(TABLE_NAME_KEY).unwrap();

        let put = rx.try_recv().unwrap();
        assert_eq!(put.key, TABLE_NAME_KEY);
        assert_eq!(decode::<String>(&put.value.unwrap()).unwrap(), "orders");
        assert!(!put.external);
        let removed = rx.try_recv().unwrap();
        assert_eq!(removed.value, None);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let subscribers = Subscribers::default();
        let rx = subscribers.subscribe();
        drop(subscribers.subscribe());
        subscribers.notify(StoreEvent::local("k", None));
        assert_eq!(subscribers.senders.lock().unwrap().len(), 1);
        assert!(rx.try_recv().is_ok());
    }
}
