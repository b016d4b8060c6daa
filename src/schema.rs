use crate::errors;
use crate::tokenizer;
use bincode::{Decode, Encode};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

lazy_static! {
    static ref TYPE_REGEX: Regex = Regex::new(
        r#"(?i)^(INT|VARCHAR\(\s*255\s*\)|TEXT|DATE|DATETIME|BOOLEAN|FLOAT|DECIMAL\(\s*10\s*,\s*2\s*\))$"#
    )
    .unwrap();
}

/// Column data types offered by the builder.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    VarChar,
    Text,
    Date,
    DateTime,
    Boolean,
    Float,
    Decimal,
}

/// How a sample value of a given type is written into generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    /// Quoted and escaped.
    Text,
    /// Emitted bare, `0` when empty.
    Numeric,
    /// Emitted bare, `TRUE` when empty.
    Boolean,
}

pub const DATA_TYPES: [DataType; 8] = [
    DataType::Int,
    DataType::VarChar,
    DataType::Text,
    DataType::Date,
    DataType::DateTime,
    DataType::Boolean,
    DataType::Float,
    DataType::Decimal,
];

impl DataType {
    pub fn category(&self) -> ValueCategory {
        match self {
            DataType::VarChar | DataType::Text | DataType::Date | DataType::DateTime => {
                ValueCategory::Text
            }
            DataType::Int | DataType::Float | DataType::Decimal => ValueCategory::Numeric,
            DataType::Boolean => ValueCategory::Boolean,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::VarChar => write!(f, "VARCHAR(255)"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Date => write!(f, "DATE"),
            DataType::DateTime => write!(f, "DATETIME"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Decimal => write!(f, "DECIMAL(10,2)"),
        }
    }
}

impl FromStr for DataType {
    type Err = errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !TYPE_REGEX.is_match(trimmed) {
            return Err(err!(
                Syntax,
                "Unsupported column type: {}. Expected one of: {}.",
                trimmed,
                DATA_TYPES
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        let normalized: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        DATA_TYPES
            .iter()
            .find(|t| t.to_string() == normalized)
            .copied()
            .ok_or_else(|| err!(Syntax, "Unsupported column type: {}.", trimmed))
    }
}

/// Column constraints offered by the builder.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey,
    NotNull,
    Unique,
    AutoIncrement,
}

pub const CONSTRAINTS: [Constraint; 4] = [
    Constraint::PrimaryKey,
    Constraint::NotNull,
    Constraint::Unique,
    Constraint::AutoIncrement,
];

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::PrimaryKey => write!(f, "PRIMARY KEY"),
            Constraint::NotNull => write!(f, "NOT NULL"),
            Constraint::Unique => write!(f, "UNIQUE"),
            Constraint::AutoIncrement => write!(f, "AUTO_INCREMENT"),
        }
    }
}

impl FromStr for Constraint {
    type Err = errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        match normalized.as_str() {
            "PRIMARY KEY" => Ok(Constraint::PrimaryKey),
            "NOT NULL" => Ok(Constraint::NotNull),
            "UNIQUE" => Ok(Constraint::Unique),
            "AUTO INCREMENT" => Ok(Constraint::AutoIncrement),
            _ => Err(err!(Syntax, "Unknown constraint: {}.", s.trim())),
        }
    }
}

/// SQL statement category selected in the builder.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
}

pub const QUERY_TYPES: [QueryType; 4] = [
    QueryType::Select,
    QueryType::Insert,
    QueryType::Update,
    QueryType::Delete,
];

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Select => write!(f, "SELECT"),
            QueryType::Insert => write!(f, "INSERT"),
            QueryType::Update => write!(f, "UPDATE"),
            QueryType::Delete => write!(f, "DELETE"),
        }
    }
}

impl FromStr for QueryType {
    type Err = errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(QueryType::Select),
            "INSERT" => Ok(QueryType::Insert),
            "UPDATE" => Ok(QueryType::Update),
            "DELETE" => Ok(QueryType::Delete),
            _ => Err(err!(Syntax, "Invalid query type: {}.", s.trim())),
        }
    }
}

/// One column of the table being designed.
#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Stable identifier, never part of generated SQL.
    pub id: String,
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<Constraint>,
    pub sample_value: String,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            data_type,
            constraints: Vec::new(),
            sample_value: String::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: &[Constraint]) -> Self {
        self.constraints = constraints.to_vec();
        self
    }

    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.sample_value = sample.into();
        self
    }

    /// Whether the column has a usable name.
    pub fn is_active(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Adds the constraint at the end, or removes it if already present.
    pub fn toggle_constraint(&mut self, constraint: Constraint) {
        if self.constraints.contains(&constraint) {
            self.constraints.retain(|c| *c != constraint);
        } else {
            self.constraints.push(constraint);
        }
    }
}

impl Default for ColumnDefinition {
    fn default() -> Self {
        ColumnDefinition::new("", DataType::Int)
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_active() { self.name.as_str() } else { "<unnamed>" };
        write!(f, "{} {}", name, self.data_type)?;
        for c in &self.constraints {
            write!(f, " {}", c)?;
        }
        if !self.sample_value.is_empty() {
            write!(f, " = {}", self.sample_value)?;
        }
        Ok(())
    }
}

/// Parses a column spec of the form `<name> <TYPE> [CONSTRAINT ...] [= sample]`.
///
/// Everything after the first `=` is the sample value. Two-word constraints may
/// be written with a space (`NOT NULL`) or an underscore (`NOT_NULL`).
pub fn parse_column_spec(spec: &str) -> Result<ColumnDefinition, errors::Error> {
    let (head, sample) = match spec.split_once('=') {
        Some((head, sample)) => (head, sample.trim()),
        None => (spec, ""),
    };

    let tokens = tokenizer::tokenize(head)?;
    let mut tokens = tokens.iter().map(String::as_str);

    let name = tokens
        .next()
        .ok_or_else(|| err!(Syntax, "Column spec must start with a column name."))?;
    let data_type: DataType = tokens
        .next()
        .ok_or_else(|| err!(Syntax, "Column '{}' must be followed by a type.", name))?
        .parse()?;
    let rest: Vec<&str> = tokens.collect();
    let constraints = parse_constraints(&rest)?;

    Ok(ColumnDefinition::new(name, data_type)
        .with_constraints(&constraints)
        .with_sample(sample))
}

/// Parses a constraint list, joining the two-word forms.
pub fn parse_constraints(words: &[&str]) -> Result<Vec<Constraint>, errors::Error> {
    let mut constraints = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let word = words[i].to_uppercase();
        let (constraint, used) = match word.as_str() {
            "PRIMARY" | "NOT" => {
                let next = words.get(i + 1).ok_or_else(|| {
                    err!(Syntax, "Incomplete constraint: {}.", words[i])
                })?;
                (format!("{} {}", word, next).parse::<Constraint>()?, 2)
            }
            _ => (word.parse::<Constraint>()?, 1),
        };
        if !constraints.contains(&constraint) {
            constraints.push(constraint);
        }
        i += used;
    }
    Ok(constraints)
}
