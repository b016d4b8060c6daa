use crate::errors;
use crate::generator;
use crate::schema::{ColumnDefinition, QueryType};
use bincode::{Decode, Encode};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// A named query with a snapshot of the builder input it came from.
#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub struct SavedQuery {
    pub id: String,
    pub name: String,
    pub query: String,
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
    pub query_type: QueryType,
    /// RFC 3339 UTC timestamp of the last save.
    pub created_at: String,
}

impl SavedQuery {
    /// The name, or `Query for <table>` when unnamed.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Query for {}", self.table_name)
        } else {
            self.name.clone()
        }
    }

    /// Save time in local time as `yyyy-MM-dd HH:mm:ss`, or the raw text if unparsable.
    pub fn saved_at(&self) -> String {
        format_timestamp(&self.created_at, "%Y-%m-%d %H:%M:%S")
    }
}

/// Builder input captured at save time.
#[derive(Debug, Clone)]
pub struct QueryDraft<'a> {
    pub name: &'a str,
    pub query: &'a str,
    pub table_name: &'a str,
    pub columns: &'a [ColumnDefinition],
    pub query_type: QueryType,
}

/// Whether `query` may be persisted: advisory and error text is rejected.
pub fn is_saveable(query: &str) -> bool {
    !query.is_empty() && !generator::is_advisory(query) && !query.starts_with("Error:")
}

/// The saved-query library, newest first.
#[derive(Encode, Decode, Debug, Clone, Default, PartialEq)]
pub struct SavedQueries {
    queries: Vec<SavedQuery>,
}

impl SavedQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[SavedQuery] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&SavedQuery> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// Saves `draft`, replacing the entry `editing_id` when it exists.
    ///
    /// # Returns
    /// The stored record, or an `errors::Error` when the query text is not saveable.
    pub fn save(
        &mut self,
        draft: &QueryDraft<'_>,
        editing_id: Option<&str>,
    ) -> Result<&SavedQuery, errors::Error> {
        if !is_saveable(draft.query) {
            return Err(err!(InvalidOperation, "Query is empty or invalid."));
        }

        let name = match draft.name.trim() {
            "" => format!("Query for {} ({})", draft.table_name, draft.query_type),
            n => n.to_string(),
        };
        let now = Utc::now().to_rfc3339();

        let existing = editing_id.and_then(|id| self.queries.iter().position(|q| q.id == id));
        let index = match existing {
            Some(index) => {
                let entry = &mut self.queries[index];
                entry.name = name;
                entry.query = draft.query.to_string();
                entry.table_name = draft.table_name.to_string();
                entry.columns = draft.columns.to_vec();
                entry.query_type = draft.query_type;
                entry.created_at = now;
                info!(id = %entry.id, name = %entry.name, "Updated saved query.");
                index
            }
            None => {
                let entry = SavedQuery {
                    id: Uuid::new_v4().to_string(),
                    name,
                    query: draft.query.to_string(),
                    table_name: draft.table_name.to_string(),
                    columns: draft.columns.to_vec(),
                    query_type: draft.query_type,
                    created_at: now,
                };
                info!(id = %entry.id, name = %entry.name, "Saved query.");
                self.queries.insert(0, entry);
                0
            }
        };
        Ok(&self.queries[index])
    }

    /// Renames a saved query; blank names are rejected.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), errors::Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(err!(InvalidOperation, "Query name cannot be empty."));
        }
        let entry = self
            .queries
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| err!(NotFound, "Saved query '{}' not found.", id))?;
        entry.name = name.to_string();
        debug!(id, name, "Renamed saved query.");
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<SavedQuery, errors::Error> {
        let index = self
            .queries
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| err!(NotFound, "Saved query '{}' not found.", id))?;
        let removed = self.queries.remove(index);
        info!(id, "Deleted saved query.");
        Ok(removed)
    }

    /// Renders every saved query as a commented SQL script.
    pub fn export(&self) -> Result<String, errors::Error> {
        if self.queries.is_empty() {
            return Err(err!(
                InvalidOperation,
                "There are no saved queries to export."
            ));
        }
        Ok(self
            .queries
            .iter()
            .map(|q| {
                format!(
                    "-- Query Name: {}\n-- Saved At: {}\n{}\n\n",
                    q.display_name(),
                    q.saved_at(),
                    q.query
                )
            })
            .collect())
    }
}

/// `query_backup_<yyyy-MM-dd>.sql`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("query_backup_{}.sql", date.format("%Y-%m-%d"))
}

fn format_timestamp(timestamp: &str, pattern: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => t.with_timezone(&Local).format(pattern).to_string(),
        Err(_) => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn draft<'a>(name: &'a str, query: &'a str, columns: &'a [ColumnDefinition]) -> QueryDraft<'a> {
        QueryDraft {
            name,
            query,
            table_name: "users",
            columns,
            query_type: QueryType::Select,
        }
    }

    #[test]
    fn test_is_saveable() {
        assert!(is_saveable("SELECT * FROM `t` LIMIT 0, 25;"));
        assert!(!is_saveable(""));
        assert!(!is_saveable("-- Please enter a table name."));
        assert!(!is_saveable("Error: Could not generate suggestion."));
    }

    #[test]
    fn test_save_rejects_advisory_text() {
        let mut saved = SavedQueries::new();
        let err = saved
            .save(&draft("x", "-- Please enter a table name.", &[]), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "[7000] Invalid Operation: Query is empty or invalid.");
        assert!(saved.is_empty());
    }

    #[test]
    fn test_save_defaults_name_and_inserts_newest_first() {
        let mut saved = SavedQueries::new();
        let cols = vec![ColumnDefinition::new("id", DataType::Int)];
        let first_id = saved.save(&draft("  ", "SELECT 1;", &cols), None).unwrap().id.clone();
        saved.save(&draft("Second", "SELECT 2;", &cols), None).unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved.list()[0].name, "Second");
        assert_eq!(saved.list()[1].name, "Query for users (SELECT)");
        assert_eq!(saved.list()[1].id, first_id);
        assert_eq!(saved.list()[1].columns, cols);
        assert!(DateTime::parse_from_rfc3339(&saved.list()[1].created_at).is_ok());
    }

    #[test]
    fn test_save_while_editing_updates_in_place() {
        let mut saved = SavedQueries::new();
        let id = saved.save(&draft("A", "SELECT 1;", &[]), None).unwrap().id.clone();
        saved.save(&draft("B", "SELECT 2;", &[]), None).unwrap();

        let updated = saved.save(&draft("A2", "DELETE 1;", &[]), Some(&id)).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(saved.len(), 2);
        let entry = saved.find(&id).unwrap();
        assert_eq!(entry.name, "A2");
        assert_eq!(entry.query, "DELETE 1;");
        assert_eq!(saved.list()[1].id, id);
    }

    #[test]
    fn test_save_with_unknown_editing_id_adds_new_entry() {
        let mut saved = SavedQueries::new();
        saved.save(&draft("A", "SELECT 1;", &[]), Some("gone")).unwrap();
        assert_eq!(saved.len(), 1);
        assert_ne!(saved.list()[0].id, "gone");
    }

    #[test]
    fn test_rename_and_delete() {
        let mut saved = SavedQueries::new();
        let id = saved.save(&draft("A", "SELECT 1;", &[]), None).unwrap().id.clone();

        assert!(saved.rename(&id, "   ").is_err());
        saved.rename(&id, "  Active users ").unwrap();
        assert_eq!(saved.find(&id).unwrap().name, "Active users");
        assert_eq!(saved.rename("missing", "x").unwrap_err().code(), 5000);

        assert_eq!(saved.delete(&id).unwrap().name, "Active users");
        assert!(saved.is_empty());
        assert_eq!(saved.delete(&id).unwrap_err().code(), 5000);
    }

    #[test]
    fn test_export_format() {
        let mut saved = SavedQueries::new();
        assert!(saved.export().is_err());

        saved.save(&draft("Users", "SELECT 1;", &[]), None).unwrap();
        let entry = saved.list()[0].clone();
        let expected_time = DateTime::parse_from_rfc3339(&entry.created_at)
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        assert_eq!(
            saved.export().unwrap(),
            format!(
                "-- Query Name: Users\n-- Saved At: {}\nSELECT 1;\n\n",
                expected_time
            )
        );
    }

    #[test]
    fn test_display_name_and_raw_timestamp_fallback() {
        let q = SavedQuery {
            id: "1".into(),
            name: String::new(),
            query: "SELECT 1;".into(),
            table_name: "orders".into(),
            columns: Vec::new(),
            query_type: QueryType::Select,
            created_at: "yesterday".into(),
        };
        assert_eq!(q.display_name(), "Query for orders");
        assert_eq!(q.saved_at(), "yesterday");
    }

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(backup_file_name(date), "query_backup_2024-03-09.sql");
    }
}
