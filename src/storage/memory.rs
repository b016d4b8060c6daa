use super::{Store, StoreEvent, Subscribers};
use crate::errors;
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Mutex;

/// In-process store; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    subscribers: Subscribers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, errors::Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| err!(Storage, "Failed to lock store. {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), errors::Error> {
        self.entries
            .lock()
            .map_err(|e| err!(Storage, "Failed to lock store. {}", e))?
            .insert(key.to_string(), value.to_vec());
        self.subscribers
            .notify(StoreEvent::local(key, Some(value.to_vec())));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), errors::Error> {
        self.entries
            .lock()
            .map_err(|e| err!(Storage, "Failed to lock store. {}", e))?
            .remove(key);
        self.subscribers.notify(StoreEvent::local(key, None));
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreEvent> {
        self.subscribers.subscribe()
    }
}
