use crate::errors;
use crate::generator;
use crate::saved::{QueryDraft, SavedQueries, SavedQuery};
use crate::schema::{ColumnDefinition, Constraint, DataType, QueryType};
use crate::storage::{self, Store, StoreEvent};
use bincode::{Decode, Encode};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_TABLE_NAME: &str = "my_table";

/// Colour scheme of the shell.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(err!(Syntax, "Unknown theme: {}. Use light or dark.", s.trim())),
        }
    }
}

/// Partial update of a column; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ColumnPatch {
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub constraints: Option<Vec<Constraint>>,
    pub sample_value: Option<String>,
}

/// Columns a fresh builder starts with.
pub fn default_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", DataType::Int)
            .with_constraints(&[Constraint::PrimaryKey, Constraint::AutoIncrement])
            .with_sample("1"),
        ColumnDefinition::new("name", DataType::VarChar)
            .with_constraints(&[Constraint::NotNull])
            .with_sample("John Doe"),
        ColumnDefinition::new("email", DataType::VarChar)
            .with_constraints(&[Constraint::Unique])
            .with_sample("john.doe@example.com"),
        ColumnDefinition::new("created_at", DataType::DateTime).with_sample("NOW()"),
    ]
}

/// Builder state owned by the shell.
///
/// Every setter writes the changed field through to the store and
/// regenerates the current query. Store failures are logged, not returned:
/// the builder keeps working from memory. The saved-query list is re-read
/// before each change so writers sharing a store do not drop each other's
/// entries.
pub struct AppState {
    store: Arc<dyn Store>,
    changes: Receiver<StoreEvent>,
    table_name: String,
    columns: Vec<ColumnDefinition>,
    query_type: QueryType,
    theme: Theme,
    saved: SavedQueries,
    generated_query: String,
    current_query_name: String,
    editing_query_id: Option<String>,
    simulated_error: String,
    fix_suggestion: String,
}

impl AppState {
    /// Loads state from `store`, falling back to defaults per key.
    pub fn load(store: Arc<dyn Store>) -> Self {
        let s = store.as_ref();
        let table_name = storage::load(s, storage::TABLE_NAME_KEY, DEFAULT_TABLE_NAME.to_string());
        let columns = storage::load(s, storage::COLUMNS_KEY, default_columns());
        let query_type = storage::load(s, storage::QUERY_TYPE_KEY, QueryType::Select);
        let theme = storage::load(s, storage::THEME_KEY, Theme::Light);
        let saved = storage::load(s, storage::SAVED_QUERIES_KEY, SavedQueries::new());
        let changes = s.subscribe();

        let mut state = Self {
            store,
            changes,
            table_name,
            columns,
            query_type,
            theme,
            saved,
            generated_query: String::new(),
            current_query_name: String::new(),
            editing_query_id: None,
            simulated_error: String::new(),
            fix_suggestion: String::new(),
        };
        state.regenerate();
        state
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn saved(&self) -> &SavedQueries {
        &self.saved
    }

    pub fn generated_query(&self) -> &str {
        &self.generated_query
    }

    pub fn current_query_name(&self) -> &str {
        &self.current_query_name
    }

    pub fn editing_query_id(&self) -> Option<&str> {
        self.editing_query_id.as_deref()
    }

    pub fn simulated_error(&self) -> &str {
        &self.simulated_error
    }

    pub fn fix_suggestion(&self) -> &str {
        &self.fix_suggestion
    }

    pub fn set_table_name(&mut self, name: &str) {
        self.table_name = name.to_string();
        self.persist(storage::TABLE_NAME_KEY, &self.table_name);
        self.regenerate();
    }

    /// Appends a column and returns its id.
    pub fn add_column(&mut self, column: ColumnDefinition) -> String {
        let id = column.id.clone();
        self.columns.push(column);
        self.columns_changed();
        id
    }

    /// Id of the column at 1-based `position`.
    pub fn column_id_at(&self, position: usize) -> Result<String, errors::Error> {
        position
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .map(|c| c.id.clone())
            .ok_or_else(|| err!(NotFound, "No column at position {}.", position))
    }

    pub fn update_column(&mut self, id: &str, patch: ColumnPatch) -> Result<(), errors::Error> {
        let column = self.column_mut(id)?;
        if let Some(name) = patch.name {
            column.name = name;
        }
        if let Some(data_type) = patch.data_type {
            column.data_type = data_type;
        }
        if let Some(constraints) = patch.constraints {
            column.constraints = constraints;
        }
        if let Some(sample) = patch.sample_value {
            column.sample_value = sample;
        }
        self.columns_changed();
        Ok(())
    }

    pub fn toggle_constraint(&mut self, id: &str, constraint: Constraint) -> Result<(), errors::Error> {
        self.column_mut(id)?.toggle_constraint(constraint);
        self.columns_changed();
        Ok(())
    }

    pub fn remove_column(&mut self, id: &str) -> Result<ColumnDefinition, errors::Error> {
        let index = self.column_index(id)?;
        let removed = self.columns.remove(index);
        self.columns_changed();
        Ok(removed)
    }

    /// Moves a column to the 0-based index `to`.
    pub fn move_column(&mut self, id: &str, to: usize) -> Result<(), errors::Error> {
        if to >= self.columns.len() {
            return Err(err!(NotFound, "No column at position {}.", to + 1));
        }
        let from = self.column_index(id)?;
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        self.columns_changed();
        Ok(())
    }

    pub fn set_query_type(&mut self, query_type: QueryType) {
        self.query_type = query_type;
        self.persist(storage::QUERY_TYPE_KEY, &self.query_type);
        self.regenerate();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.persist(storage::THEME_KEY, &self.theme);
    }

    pub fn set_current_query_name(&mut self, name: &str) {
        self.current_query_name = name.to_string();
    }

    /// Rebuilds the current query from the builder fields.
    pub fn regenerate(&mut self) -> &str {
        self.generated_query =
            generator::generate_query(&self.table_name, &self.columns, self.query_type);
        &self.generated_query
    }

    /// Replaces the current query with a CREATE TABLE statement.
    pub fn generate_create_table(&mut self) -> &str {
        self.generated_query =
            generator::generate_create_table_query(&self.table_name, &self.columns);
        &self.generated_query
    }

    /// Saves the current query, updating the loaded one when in editing mode.
    pub fn save_query(&mut self) -> Result<SavedQuery, errors::Error> {
        self.refresh_saved();
        let draft = QueryDraft {
            name: &self.current_query_name,
            query: &self.generated_query,
            table_name: &self.table_name,
            columns: &self.columns,
            query_type: self.query_type,
        };
        let saved = self
            .saved
            .save(&draft, self.editing_query_id.as_deref())?
            .clone();
        self.persist(storage::SAVED_QUERIES_KEY, &self.saved);
        self.current_query_name.clear();
        self.editing_query_id = None;
        Ok(saved)
    }

    /// Id of the saved query at 1-based `position` in the list.
    pub fn saved_id_at(&self, position: usize) -> Result<String, errors::Error> {
        position
            .checked_sub(1)
            .and_then(|i| self.saved.list().get(i))
            .map(|q| q.id.clone())
            .ok_or_else(|| err!(NotFound, "No saved query at position {}.", position))
    }

    pub fn rename_saved(&mut self, id: &str, name: &str) -> Result<(), errors::Error> {
        self.refresh_saved();
        self.saved.rename(id, name)?;
        self.persist(storage::SAVED_QUERIES_KEY, &self.saved);
        Ok(())
    }

    pub fn delete_saved(&mut self, id: &str) -> Result<SavedQuery, errors::Error> {
        self.refresh_saved();
        let removed = self.saved.delete(id)?;
        self.persist(storage::SAVED_QUERIES_KEY, &self.saved);
        if self.editing_query_id.as_deref() == Some(id) {
            self.editing_query_id = None;
            self.current_query_name.clear();
        }
        Ok(removed)
    }

    /// Loads a saved snapshot into the builder and enters editing mode.
    ///
    /// The stored query text is shown as saved, not regenerated.
    pub fn load_saved(&mut self, id: &str) -> Result<SavedQuery, errors::Error> {
        self.refresh_saved();
        let query = self
            .saved
            .find(id)
            .cloned()
            .ok_or_else(|| err!(NotFound, "Saved query '{}' not found.", id))?;

        self.table_name = query.table_name.clone();
        self.columns = query.columns.clone();
        self.query_type = query.query_type;
        self.persist(storage::TABLE_NAME_KEY, &self.table_name);
        self.persist(storage::COLUMNS_KEY, &self.columns);
        self.persist(storage::QUERY_TYPE_KEY, &self.query_type);

        self.generated_query = query.query.clone();
        self.current_query_name = query.name.clone();
        self.editing_query_id = Some(query.id.clone());
        debug!(id, "Loaded saved query into builder.");
        Ok(query)
    }

    pub fn export_saved(&self) -> Result<String, errors::Error> {
        self.saved.export()
    }

    /// The simulated "table not found" error for the current table.
    pub fn missing_table_error(&self) -> Result<String, errors::Error> {
        if self.table_name.trim().is_empty() {
            return Err(err!(
                InvalidOperation,
                "Please enter a table name to simulate an error."
            ));
        }
        Ok(format!(
            "#1146 - Table 'your_database.{}' doesn't exist",
            self.table_name
        ))
    }

    pub fn set_simulation(&mut self, error: String, suggestion: String) {
        self.simulated_error = error;
        self.fix_suggestion = suggestion;
    }

    /// Applies changes other processes made to the store since the last call.
    ///
    /// Own writes are skipped: they already match the in-memory fields, and
    /// replaying a column write would replace a loaded saved query's text.
    pub fn sync(&mut self) -> usize {
        if let Err(e) = self.store.sync() {
            warn!("Error checking store for changes. {}", e);
        }
        let events: Vec<StoreEvent> = self.changes.try_iter().filter(|e| e.external).collect();
        for event in &events {
            debug!(key = %event.key, "Applying external store change.");
            self.reload(event);
        }
        events.len()
    }

    /// Applies a change made to the store by someone else.
    pub fn reload(&mut self, event: &StoreEvent) {
        fn decoded<T: Decode<()>>(event: &StoreEvent, default: T) -> T {
            match &event.value {
                Some(bytes) => storage::decode(bytes).unwrap_or_else(|e| {
                    warn!(key = %event.key, "Error parsing store change, using default. {}", e);
                    default
                }),
                None => default,
            }
        }

        match event.key.as_str() {
            storage::TABLE_NAME_KEY => {
                self.table_name = decoded(event, DEFAULT_TABLE_NAME.to_string())
            }
            storage::COLUMNS_KEY => self.columns = decoded(event, default_columns()),
            storage::QUERY_TYPE_KEY => self.query_type = decoded(event, QueryType::Select),
            storage::THEME_KEY => {
                self.theme = decoded(event, Theme::Light);
                return;
            }
            storage::SAVED_QUERIES_KEY => {
                self.saved = decoded(event, SavedQueries::new());
                return;
            }
            _ => return,
        }
        self.regenerate();
    }

    fn refresh_saved(&mut self) {
        self.saved = storage::load(
            self.store.as_ref(),
            storage::SAVED_QUERIES_KEY,
            SavedQueries::new(),
        );
    }

    fn column_index(&self, id: &str) -> Result<usize, errors::Error> {
        self.columns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| err!(NotFound, "Column '{}' not found.", id))
    }

    fn column_mut(&mut self, id: &str) -> Result<&mut ColumnDefinition, errors::Error> {
        let index = self.column_index(id)?;
        Ok(&mut self.columns[index])
    }

    fn columns_changed(&mut self) {
        self.persist(storage::COLUMNS_KEY, &self.columns);
        self.regenerate();
    }

    fn persist<T: Encode>(&self, key: &str, value: &T) {
        if let Err(e) = storage::save(self.store.as_ref(), key, value) {
            warn!(key, "Error setting store key. {}", e);
        }
    }
}
