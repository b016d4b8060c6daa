use crate::assistant::{self, NaturalLanguageRequest, TableCreationRequest};
use crate::schema::{self, ColumnDefinition, Constraint, QueryType};
use crate::state::{ColumnPatch, Theme};
use crate::{errors, generator, saved, session, tokenizer};
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use tracing::{info, trace};

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP: &str = r#"List of all commands (positions start at 1):

help                      Display this help.
show                      Show the table, columns and current query.
table <name>              Set the table name.
add <column spec>         Add a column, e.g. add email VARCHAR(255) UNIQUE = a@b.c
set <n> <column spec>     Replace column n.
rename-column <n> <name>  Rename column n.
sample <n> [value]        Set or clear the sample value of column n.
toggle <n> <constraint>   Add or remove a constraint on column n.
drop <n>                  Remove column n.
move <n> <m>              Move column n to position m.
type <query type>         Select SELECT, INSERT, UPDATE or DELETE.
gen [<query type>]        Generate the query, optionally for another type.
create                    Generate a CREATE TABLE statement.
save [name]               Save the current query.
saved                     List saved queries.
load <n|id>               Load a saved query into the builder.
rename <n|id> <name>      Rename a saved query.
delete <n|id>             Delete a saved query.
export [dir]              Write saved queries to a .sql backup file.
ask <question>            Translate a question into SQL with the assistant.
simulate                  Simulate a missing-table error and suggest a fix.
theme <light|dark>        Switch the colour theme.
version                   Show version information.
quit                      Quit.
"#;

/// Reference to a saved query, by list position or id.
#[derive(Debug, Clone, PartialEq)]
pub enum SavedRef {
    Position(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Show,
    Table(String),
    Add(ColumnDefinition),
    Set(usize, ColumnDefinition),
    RenameColumn(usize, String),
    Sample(usize, String),
    Toggle(usize, Constraint),
    Drop(usize),
    Move(usize, usize),
    Type(QueryType),
    Gen(Option<String>),
    Create,
    Save(Option<String>),
    Saved,
    Load(SavedRef),
    Rename(SavedRef, String),
    Delete(SavedRef),
    Export(Option<PathBuf>),
    Ask(String),
    Simulate,
    Theme(Theme),
    Version,
    Quit,
}

/// Text produced by a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    pub lines: Vec<String>,
    /// Set when the text is an advisory or error message rather than a result.
    pub is_error: bool,
}

impl Output {
    fn text(s: impl AsRef<str>) -> Self {
        let mut output = Output::default();
        output.push(s);
        output
    }

    /// Generator or assistant output; advisories and `Error:` lines are flagged.
    fn query(s: &str) -> Self {
        let mut output = Output::text(s);
        output.is_error = generator::is_advisory(s) || s.starts_with("Error:");
        output
    }

    fn push(&mut self, s: impl AsRef<str>) {
        self.lines.extend(s.as_ref().lines().map(str::to_string));
    }

    fn then_query(mut self, s: &str) -> Self {
        self.push("");
        self.push(s);
        self.is_error = generator::is_advisory(s);
        self
    }
}

/// Parses one shell command line.
///
/// The keyword is case-insensitive. One trailing `;` ends the command,
/// except after a sample value or a question, which run verbatim to the end
/// of the line.
pub fn parse(line: &str) -> Result<Command, errors::Error> {
    let line = line.trim();
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (terminated(line), ""),
    };
    trace!(keyword, rest, "Parsing command");

    let command = match keyword.to_lowercase().as_str() {
        "help" | "?" | "\\h" => Command::Help,
        "show" => Command::Show,
        "table" => Command::Table(text(terminated(rest))?),
        "add" => Command::Add(column_spec(rest)?),
        "set" => {
            let (n, spec) = position_and_rest(keyword, rest)?;
            Command::Set(n, column_spec(spec)?)
        }
        "rename-column" => {
            let (n, name) = position_and_rest(keyword, rest)?;
            Command::RenameColumn(n, required_text(keyword, terminated(name))?)
        }
        "sample" => {
            let (n, value) = position_and_rest(keyword, rest)?;
            Command::Sample(n, text(value)?)
        }
        "toggle" => {
            let (n, constraint) = position_and_rest(keyword, rest)?;
            Command::Toggle(n, terminated(constraint).parse()?)
        }
        "drop" => Command::Drop(position(keyword, rest)?),
        "move" => {
            let (n, m) = position_and_rest(keyword, rest)?;
            Command::Move(n, position(keyword, m)?)
        }
        "type" => Command::Type(terminated(rest).parse()?),
        "gen" => Command::Gen(optional(terminated(rest))),
        "create" => Command::Create,
        "save" => Command::Save(optional(terminated(rest)).map(|name| text(&name)).transpose()?),
        "saved" => Command::Saved,
        "load" => Command::Load(saved_ref(keyword, rest)?),
        "rename" => {
            let (target, name) = terminated(rest)
                .split_once(char::is_whitespace)
                .ok_or_else(|| err!(Syntax, "Usage: rename <n|id> <name>"))?;
            Command::Rename(saved_ref(keyword, target)?, required_text(keyword, name)?)
        }
        "delete" => Command::Delete(saved_ref(keyword, rest)?),
        "export" => Command::Export(optional(terminated(rest)).map(PathBuf::from)),
        "ask" => Command::Ask(required_text(keyword, rest)?),
        "simulate" => Command::Simulate,
        "theme" => Command::Theme(terminated(rest).parse()?),
        "version" | "\\v" => Command::Version,
        "quit" | "exit" | "\\q" => Command::Quit,
        "" => return Err(err!(Syntax, "Empty command.")),
        _ => {
            return Err(err!(
                Syntax,
                "Unknown command: {}. Type 'help' for a list of commands.",
                keyword
            ))
        }
    };
    Ok(command)
}

/// Drops one terminating `;`.
fn terminated(rest: &str) -> &str {
    rest.strip_suffix(';').unwrap_or(rest).trim_end()
}

/// A `;` after `=` belongs to the sample value.
fn column_spec(rest: &str) -> Result<ColumnDefinition, errors::Error> {
    let spec = if rest.contains('=') { rest } else { terminated(rest) };
    schema::parse_column_spec(spec)
}

fn optional(rest: &str) -> Option<String> {
    Some(rest.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Free text argument; a single quoted token is unquoted.
fn text(rest: &str) -> Result<String, errors::Error> {
    let rest = rest.trim();
    if rest.starts_with('\'') {
        let tokens = tokenizer::tokenize(rest)?;
        if let [token] = tokens.as_slice() {
            return Ok(token.clone());
        }
    }
    Ok(rest.to_string())
}

fn required_text(keyword: &str, rest: &str) -> Result<String, errors::Error> {
    let value = text(rest)?;
    if value.trim().is_empty() {
        return Err(err!(Syntax, "{} requires an argument.", keyword));
    }
    Ok(value)
}

fn position(keyword: &str, arg: &str) -> Result<usize, errors::Error> {
    match terminated(arg.trim()).parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(err!(
            Syntax,
            "{} expects a column position starting at 1, got '{}'.",
            keyword,
            arg.trim()
        )),
    }
}

fn position_and_rest<'a>(keyword: &str, rest: &'a str) -> Result<(usize, &'a str), errors::Error> {
    let (n, tail) = match rest.split_once(char::is_whitespace) {
        Some((n, tail)) => (n, tail.trim()),
        None => (rest, ""),
    };
    Ok((position(keyword, n)?, tail))
}

fn saved_ref(keyword: &str, arg: &str) -> Result<SavedRef, errors::Error> {
    let arg = terminated(arg.trim());
    if arg.is_empty() {
        return Err(err!(Syntax, "{} requires a saved query number or id.", keyword));
    }
    Ok(match arg.parse::<usize>() {
        Ok(n) => SavedRef::Position(n),
        Err(_) => SavedRef::Id(arg.to_string()),
    })
}

fn resolve(session: &session::Session, target: &SavedRef) -> Result<String, errors::Error> {
    match target {
        SavedRef::Position(n) => session.state.saved_id_at(*n),
        SavedRef::Id(id) => Ok(id.clone()),
    }
}

/// Executes a command against the session state.
pub fn execute(
    session: &mut session::Session,
    command: Command,
) -> Result<Output, errors::Error> {
    let state = &mut session.state;
    match command {
        Command::Help => Ok(Output::text(HELP)),
        Command::Show => Ok(show(session)),
        Command::Table(name) => {
            state.set_table_name(&name);
            Ok(Output::query(state.generated_query()))
        }
        Command::Add(column) => {
            let line = format!("Added column {}: {}", state.columns().len() + 1, column);
            state.add_column(column);
            Ok(Output::text(line).then_query(state.generated_query()))
        }
        Command::Set(n, column) => {
            let id = state.column_id_at(n)?;
            state.update_column(
                &id,
                ColumnPatch {
                    name: Some(column.name),
                    data_type: Some(column.data_type),
                    constraints: Some(column.constraints),
                    sample_value: Some(column.sample_value),
                },
            )?;
            Ok(column_changed(state, n))
        }
        Command::RenameColumn(n, name) => {
            let id = state.column_id_at(n)?;
            state.update_column(
                &id,
                ColumnPatch {
                    name: Some(name),
                    ..Default::default()
                },
            )?;
            Ok(column_changed(state, n))
        }
        Command::Sample(n, value) => {
            let id = state.column_id_at(n)?;
            state.update_column(
                &id,
                ColumnPatch {
                    sample_value: Some(value),
                    ..Default::default()
                },
            )?;
            Ok(column_changed(state, n))
        }
        Command::Toggle(n, constraint) => {
            let id = state.column_id_at(n)?;
            state.toggle_constraint(&id, constraint)?;
            Ok(column_changed(state, n))
        }
        Command::Drop(n) => {
            let id = state.column_id_at(n)?;
            let removed = state.remove_column(&id)?;
            Ok(Output::text(format!("Removed column {}.", removed))
                .then_query(state.generated_query()))
        }
        Command::Move(n, m) => {
            let id = state.column_id_at(n)?;
            state.move_column(&id, m - 1)?;
            Ok(Output::text(format!("Moved column {} to position {}.", n, m))
                .then_query(state.generated_query()))
        }
        Command::Type(query_type) => {
            state.set_query_type(query_type);
            Ok(Output::query(state.generated_query()))
        }
        Command::Gen(None) => Ok(Output::query(state.regenerate())),
        Command::Gen(Some(query_type)) => Ok(Output::query(&generator::generate_query_named(
            state.table_name(),
            state.columns(),
            &query_type,
        ))),
        Command::Create => Ok(Output::query(state.generate_create_table())),
        Command::Save(name) => {
            if let Some(name) = name {
                state.set_current_query_name(&name);
            }
            let updating = state.editing_query_id().is_some();
            let saved = state.save_query()?;
            Ok(Output::text(format!(
                "\"{}\" has been {}.",
                saved.name,
                if updating { "updated" } else { "saved" }
            )))
        }
        Command::Saved => Ok(list_saved(session)),
        Command::Load(target) => {
            let id = resolve(session, &target)?;
            let state = &mut session.state;
            let loaded = state.load_saved(&id)?;
            Ok(
                Output::text(format!("\"{}\" loaded into builder.", loaded.display_name()))
                    .then_query(state.generated_query()),
            )
        }
        Command::Rename(target, name) => {
            let id = resolve(session, &target)?;
            session.state.rename_saved(&id, &name)?;
            Ok(Output::text("Query name changed."))
        }
        Command::Delete(target) => {
            let id = resolve(session, &target)?;
            let removed = session.state.delete_saved(&id)?;
            Ok(Output::text(format!("\"{}\" deleted.", removed.display_name())))
        }
        Command::Export(dir) => {
            let script = state.export_saved()?;
            let path = dir
                .unwrap_or_else(|| PathBuf::from("."))
                .join(saved::backup_file_name(Local::now().date_naive()));
            fs::write(&path, script)?;
            info!(path = %path.display(), "Exported saved queries.");
            Ok(Output::text(format!(
                "Exported {} saved quer{} to {}.",
                state.saved().len(),
                if state.saved().len() == 1 { "y" } else { "ies" },
                path.display()
            )))
        }
        Command::Ask(question) => {
            assistant::check_natural_language_input(
                &question,
                session.state.table_name(),
                session.state.columns(),
            )?;
            let request = NaturalLanguageRequest::new(
                &question,
                session.state.table_name(),
                session.state.columns(),
            );
            let sql = assistant::sql_from_natural_language(session.assistant()?, &request);
            Ok(Output::query(&sql))
        }
        Command::Simulate => {
            let error = session.state.missing_table_error()?;
            let request = TableCreationRequest {
                sql_error: error.clone(),
                table_name: session.state.table_name().to_string(),
            };
            let suggestion = match session.assistant() {
                Ok(a) => assistant::table_creation_suggestion(a, &request),
                Err(e) => format!("Error: Could not generate suggestion. Details: {}", e.message()),
            };
            session.state.set_simulation(error, suggestion);
            Ok(simulation(session))
        }
        Command::Theme(theme) => {
            state.set_theme(theme);
            Ok(Output::text(format!("Theme set to {}.", theme)))
        }
        Command::Version => Ok(Output::text(format!("{} version: {}", NAME, VERSION))),
        Command::Quit => Ok(Output::text("Bye")),
    }
}

fn column_changed(state: &crate::state::AppState, n: usize) -> Output {
    let column = &state.columns()[n - 1];
    Output::text(format!("Column {}: {}", n, column)).then_query(state.generated_query())
}

fn show(session: &session::Session) -> Output {
    let state = &session.state;
    let mut output = Output::text(format!("Table: {}", state.table_name()));
    output.push(format!("Query type: {}", state.query_type()));
    if state.editing_query_id().is_some() {
        output.push(format!("Editing: {}", state.current_query_name()));
    }
    output.push("Columns:");
    if state.columns().is_empty() {
        output.push("  (none)");
    }
    for (i, column) in state.columns().iter().enumerate() {
        output.push(format!("  {}. {}", i + 1, column));
    }
    output.then_query(state.generated_query())
}

fn list_saved(session: &session::Session) -> Output {
    let state = &session.state;
    if state.saved().is_empty() {
        return Output::text("No saved queries yet.");
    }
    let mut output = Output::default();
    for (i, q) in state.saved().list().iter().enumerate() {
        let marker = if state.editing_query_id() == Some(q.id.as_str()) { "*" } else { " " };
        output.push(format!(
            "{}{}. {} [{} on {}] {} ({})",
            marker,
            i + 1,
            q.display_name(),
            q.query_type,
            q.table_name,
            q.saved_at(),
            q.id
        ));
    }
    output
}

fn simulation(session: &session::Session) -> Output {
    let state = &session.state;
    let mut output = Output::text(format!("Simulated error: {}", state.simulated_error()));
    output.push("Suggested fix:");
    output.push(state.fix_suggestion());
    output.is_error = state.fix_suggestion().starts_with("Error:");
    output
}
