//! Port to the language-model collaborator.
//!
//! The shell only needs two completions: SQL for a natural-language question,
//! and a CREATE TABLE suggestion for a "table does not exist" error. Both go
//! through [`SqlAssistant`]; [`CommandAssistant`] fulfils them by piping the
//! rendered prompt into an external program.

use crate::errors;
use crate::schema::ColumnDefinition;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, error, info};

/// Natural-language question about one table.
#[derive(Debug, Clone)]
pub struct NaturalLanguageRequest {
    pub natural_language_query: String,
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl NaturalLanguageRequest {
    /// Builds a request, dropping columns without a name.
    pub fn new(question: &str, table_name: &str, columns: &[ColumnDefinition]) -> Self {
        Self {
            natural_language_query: question.to_string(),
            table_name: table_name.to_string(),
            columns: columns.iter().filter(|c| c.is_active()).cloned().collect(),
        }
    }

    pub fn prompt(&self) -> String {
        let mut prompt = String::from(
            "You are an expert SQL generator. Your task is to translate the user's natural \
             language request into a syntactically correct SQL query for the given table and its columns.\n\
             Consider the table structure carefully when generating the query.\n\
             If the request implies a specific type of query (SELECT, INSERT, UPDATE, DELETE), generate that.\n\
             For INSERT or UPDATE, use example values from the column definitions if appropriate, \
             or use placeholders if specific values are not provided in the natural language query.\n\
             For SELECT, UPDATE, and DELETE, include a WHERE clause if the user's request implies conditions. \
             If no conditions are obvious for UPDATE or DELETE, add a placeholder comment like '/* your condition here */'.\n\n",
        );
        let _ = writeln!(prompt, "Table Name: `{}`\n", self.table_name);
        prompt.push_str("Columns (Name, Type, Constraints):\n");
        for column in &self.columns {
            let _ = write!(prompt, "  - `{}` ({})", column.name, column.data_type);
            if !column.constraints.is_empty() {
                let constraints = column
                    .constraints
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = write!(prompt, " [{}]", constraints);
            }
            let _ = writeln!(prompt, " (Example: '{}')", column.sample_value);
        }
        let _ = write!(
            prompt,
            "\nUser's Natural Language Query:\n\"{}\"\n\n\
             Generated SQL Query (Only output the SQL query. Do not include any surrounding text, \
             explanations, or markdown formatting like ```sql ... ```):\n",
            self.natural_language_query
        );
        prompt
    }
}

/// A SQL error to be fixed with a CREATE TABLE statement.
#[derive(Debug, Clone)]
pub struct TableCreationRequest {
    pub sql_error: String,
    pub table_name: String,
}

impl TableCreationRequest {
    pub fn prompt(&self) -> String {
        format!(
            "You are an SQL expert. Given the following SQL error message and table name, \
             generate a suitable SQL CREATE TABLE statement to fix the error.\n\n\
             SQL Error: {}\n\
             Table Name: {}\n\n\
             Consider common column types and a basic primary key setup.  The generated SQL \
             should be executable and fix the missing table error.\n\n\
             Ensure that your response only includes the CREATE TABLE statement, and nothing else. \
             Do not include any explanation.\n\n\
             Here is the CREATE TABLE statement:\n",
            self.sql_error, self.table_name
        )
    }
}

pub trait SqlAssistant {
    fn natural_language_to_sql(
        &self,
        request: &NaturalLanguageRequest,
    ) -> Result<String, errors::Error>;

    fn suggest_table_creation(&self, request: &TableCreationRequest)
        -> Result<String, errors::Error>;
}

/// Removes a surrounding ```` ```sql ```` fence from a completion.
pub fn strip_sql_fences(text: &str) -> Result<String, errors::Error> {
    let mut sql = text.trim();
    if let Some(rest) = sql.strip_prefix("```sql") {
        sql = rest;
    }
    if let Some(rest) = sql.strip_suffix("```") {
        sql = rest;
    }
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(err!(Assistant, "AI failed to generate SQL query."));
    }
    Ok(sql.to_string())
}

/// Checks a question can be sent before calling the assistant.
pub fn check_natural_language_input(
    question: &str,
    table_name: &str,
    columns: &[ColumnDefinition],
) -> Result<(), errors::Error> {
    if question.trim().is_empty() {
        return Err(err!(InvalidOperation, "Please enter a question to convert to SQL."));
    }
    if table_name.trim().is_empty() {
        return Err(err!(
            InvalidOperation,
            "Please enter a table name before asking a question."
        ));
    }
    if !columns.iter().any(|c| c.is_active()) {
        return Err(err!(
            InvalidOperation,
            "Please define at least one named column before asking a question."
        ));
    }
    Ok(())
}

/// Runs the natural-language flow, returning SQL or an `Error:` line.
pub fn sql_from_natural_language(
    assistant: &dyn SqlAssistant,
    request: &NaturalLanguageRequest,
) -> String {
    match assistant
        .natural_language_to_sql(request)
        .and_then(|sql| strip_sql_fences(&sql))
    {
        Ok(sql) => sql,
        Err(e) => {
            error!(table = %request.table_name, "Natural language to SQL failed. {}", e);
            format!(
                "Error: Could not generate SQL from natural language. Details: {}",
                e.message()
            )
        }
    }
}

/// Runs the table-creation flow, returning a statement or an `Error:` line.
pub fn table_creation_suggestion(
    assistant: &dyn SqlAssistant,
    request: &TableCreationRequest,
) -> String {
    match assistant
        .suggest_table_creation(request)
        .and_then(|sql| strip_sql_fences(&sql))
    {
        Ok(sql) => sql,
        Err(e) => {
            error!(table = %request.table_name, "Table creation suggestion failed. {}", e);
            format!("Error: Could not generate suggestion. Details: {}", e.message())
        }
    }
}

/// Assistant backed by an external program.
///
/// The command line runs under `sh -c`; the prompt is written to its stdin
/// while the completion is read from its stdout.
#[derive(Debug, Clone)]
pub struct CommandAssistant {
    command: String,
}

impl CommandAssistant {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn complete(&self, prompt: &str) -> Result<String, errors::Error> {
        debug!(command = %self.command, prompt_len = prompt.len(), "Running assistant.");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| err!(Assistant, "Failed to start '{}'. {}", self.command, e))?;

        // Written from its own thread while stdout is drained below.
        let stdin = child.stdin.take();
        let input = prompt.as_bytes().to_vec();
        let writer = thread::spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                // The program may exit without reading its input.
                match stdin.write_all(&input) {
                    Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        });
        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| err!(Assistant, "Failed to write the prompt to '{}'.", self.command))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(err!(
                Assistant,
                "'{}' exited with {}. {}",
                self.command,
                output.status,
                stderr.trim()
            ));
        }
        let completion = String::from_utf8(output.stdout)?;
        info!(bytes = completion.len(), "Assistant completed.");
        Ok(completion)
    }
}

impl SqlAssistant for CommandAssistant {
    fn natural_language_to_sql(
        &self,
        request: &NaturalLanguageRequest,
    ) -> Result<String, errors::Error> {
        self.complete(&request.prompt())
    }

    fn suggest_table_creation(
        &self,
        request: &TableCreationRequest,
    ) -> Result<String, errors::Error> {
        self.complete(&request.prompt())
    }
}
