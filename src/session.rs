use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    assistant::{CommandAssistant, SqlAssistant},
    config::{Config, StoreLocation},
    errors,
    state::AppState,
    storage::{FileStore, MemoryStore, Store},
};

pub struct Session {
    pub id: Uuid,
    pub state: AppState,
    assistant: Option<Box<dyn SqlAssistant>>,
}

impl Session {
    pub fn open(config: &Config) -> Result<Self, errors::Error> {
        let store: Arc<dyn Store> = match &config.store {
            StoreLocation::Directory(dir) => Arc::new(FileStore::open(dir)?),
            StoreLocation::Memory => Arc::new(MemoryStore::new()),
        };
        let assistant = config
            .assistant_cmd
            .as_ref()
            .map(|cmd| Box::new(CommandAssistant::new(cmd.as_str())) as Box<dyn SqlAssistant>);
        Ok(Self::with_store(store, assistant))
    }

    pub fn with_store(store: Arc<dyn Store>, assistant: Option<Box<dyn SqlAssistant>>) -> Self {
        let session = Session {
            id: Uuid::new_v4(),
            state: AppState::load(store),
            assistant,
        };
        info!(
            session_id = %session.id,
            table = session.state.table_name(),
            saved = session.state.saved().len(),
            "Opened session."
        );
        session
    }

    /// The configured assistant, or an error explaining how to set one up.
    pub fn assistant(&self) -> Result<&dyn SqlAssistant, errors::Error> {
        self.assistant.as_deref().ok_or_else(|| {
            err!(
                Assistant,
                "No assistant configured. Set --assistant-cmd or QUERYCRAFT_ASSISTANT_CMD."
            )
        })
    }

    pub fn close(&mut self) {
        info!(session_id = %self.id, "Closed session.");
    }
}
