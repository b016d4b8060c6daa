//! SQL statement generation from the table being designed.
//!
//! Every function here is pure and total: bad input yields an advisory
//! comment (a string starting with `--`) instead of an error.

use crate::schema::{ColumnDefinition, QueryType, ValueCategory};
use tracing::trace;

pub const MISSING_TABLE_NAME: &str = "-- Please enter a table name.";
pub const MISSING_COLUMN_NAMES: &str = "-- Please ensure all columns have names.";
pub const INSERT_NEEDS_COLUMNS: &str = "-- Please add columns to generate an INSERT query.";
pub const UPDATE_NEEDS_COLUMNS: &str = "-- Please add columns to generate an UPDATE query.";
pub const INVALID_QUERY_TYPE: &str = "-- Invalid query type.";

/// Fixed preview cap appended to every SELECT.
const SELECT_LIMIT: &str = "LIMIT 0, 25";
const WHERE_PLACEHOLDER: &str = "WHERE /* your condition here (e.g., id = 1) */;";
const UPDATE_NOTE: &str =
    "-- Note: Always use a WHERE clause for UPDATE statements to avoid unintended data changes.";
const DELETE_NOTE: &str =
    "-- Note: Always use a WHERE clause for DELETE statements to avoid unintended data loss.";

/// Generates the statement for `query_type` over `table_name` and `columns`.
///
/// # Arguments
/// * `table_name` - Table identifier, emitted inside backticks as given.
/// * `columns` - Ordered column definitions; order is kept in every clause.
/// * `query_type` - Which statement to build.
///
/// # Returns
/// The SQL text, or an advisory placeholder when input is incomplete.
pub fn generate_query(
    table_name: &str,
    columns: &[ColumnDefinition],
    query_type: QueryType,
) -> String {
    trace!(table = table_name, columns = columns.len(), %query_type, "Generating query");

    if table_name.trim().is_empty() {
        return MISSING_TABLE_NAME.to_string();
    }
    if columns.iter().any(|c| !c.is_active()) {
        return MISSING_COLUMN_NAMES.to_string();
    }

    let active: Vec<&ColumnDefinition> = columns.iter().filter(|c| c.is_active()).collect();
    let table = quote_identifier(table_name);
    let column_names = active
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    match query_type {
        QueryType::Select => {
            if active.is_empty() {
                format!("SELECT * FROM {} {};", table, SELECT_LIMIT)
            } else {
                format!("SELECT {} FROM {} {};", column_names, table, SELECT_LIMIT)
            }
        }
        QueryType::Insert => {
            if active.is_empty() {
                return INSERT_NEEDS_COLUMNS.to_string();
            }
            let values = active
                .iter()
                .map(|c| format_value(c, "sample_value"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({});",
                table, column_names, values
            )
        }
        QueryType::Update => {
            if active.is_empty() {
                return UPDATE_NEEDS_COLUMNS.to_string();
            }
            let clauses = active
                .iter()
                .map(|c| format!("{} = {}", quote_identifier(&c.name), format_value(c, "new_value")))
                .collect::<Vec<_>>()
                .join(",\n  ");
            format!(
                "UPDATE {}\nSET\n  {}\n{}\n{}",
                table, clauses, WHERE_PLACEHOLDER, UPDATE_NOTE
            )
        }
        QueryType::Delete => format!(
            "DELETE FROM {} {}\n{}",
            table, WHERE_PLACEHOLDER, DELETE_NOTE
        ),
    }
}

/// Same as [`generate_query`], with the query type given by name.
///
/// An unrecognised name yields [`INVALID_QUERY_TYPE`].
pub fn generate_query_named(
    table_name: &str,
    columns: &[ColumnDefinition],
    query_type: &str,
) -> String {
    match query_type.parse::<QueryType>() {
        Ok(q) => generate_query(table_name, columns, q),
        Err(_) => INVALID_QUERY_TYPE.to_string(),
    }
}

/// Generates a `CREATE TABLE IF NOT EXISTS` statement.
///
/// Unlike [`generate_query`], unnamed columns are skipped rather than
/// blocking generation, as long as at least one column is named.
pub fn generate_create_table_query(table_name: &str, columns: &[ColumnDefinition]) -> String {
    trace!(table = table_name, columns = columns.len(), "Generating CREATE TABLE");

    if table_name.trim().is_empty() {
        return MISSING_TABLE_NAME.to_string();
    }
    if columns.iter().all(|c| !c.is_active()) {
        return format!(
            "-- Please add and define columns for table {}.",
            table_name
        );
    }

    let definitions = columns
        .iter()
        .filter(|c| c.is_active())
        .map(|c| {
            let mut definition = format!("{} {}", quote_identifier(&c.name), c.data_type);
            if !c.constraints.is_empty() {
                let constraints = c
                    .constraints
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                definition.push(' ');
                definition.push_str(&constraints);
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(",\n  ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n);",
        quote_identifier(table_name),
        definitions
    )
}

/// Whether generator output is an advisory placeholder rather than SQL.
pub fn is_advisory(text: &str) -> bool {
    text.starts_with("--")
}

/// Identifiers are trusted input; embedded backticks are not escaped.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name)
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders a column's sample value for VALUES or SET.
///
/// `placeholder` is the text quoted in when a text-like column has no sample.
fn format_value(column: &ColumnDefinition, placeholder: &str) -> String {
    let val = column.sample_value.trim();
    match column.data_type.category() {
        ValueCategory::Numeric if val.is_empty() => "0".to_string(),
        ValueCategory::Boolean if val.is_empty() => "TRUE".to_string(),
        // Not validated: whatever was typed goes out bare.
        ValueCategory::Numeric | ValueCategory::Boolean => val.to_string(),
        ValueCategory::Text if val.is_empty() => quote_literal(placeholder),
        ValueCategory::Text => quote_literal(val),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Constraint, DataType};

    fn users() -> Vec<ColumnDefinition> {
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

    #[test]
    fn test_select_lists_columns_in_order() {
        assert_eq!(
            generate_query("users", &users(), QueryType::Select),
            "SELECT `id`, `name`, `email`, `created_at` FROM `users` LIMIT 0, 25;"
        );
    }

    #[test]
    fn test_select_without_columns_uses_star() {
        assert_eq!(
            generate_query("users", &[], QueryType::Select),
            "SELECT * FROM `users` LIMIT 0, 25;"
        );
    }

    #[test]
    fn test_select_preserves_any_column_order() {
        let mut cols = users();
        cols.reverse();
        assert_eq!(
            generate_query("users", &cols, QueryType::Select),
            "SELECT `created_at`, `email`, `name`, `id` FROM `users` LIMIT 0, 25;"
        );
        cols.swap(0, 2);
        let sql = generate_query("users", &cols, QueryType::Select);
        let positions: Vec<usize> = cols
            .iter()
            .map(|c| sql.find(&format!("`{}`", c.name)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_insert_update_and_create_follow_column_order() {
        let mut cols = users();
        cols.reverse();
        assert_eq!(
            generate_query("users", &cols, QueryType::Insert),
            "INSERT INTO `users` (`created_at`, `email`, `name`, `id`) \
             VALUES ('NOW()', 'john.doe@example.com', 'John Doe', 1);"
        );
        assert!(generate_query("users", &cols, QueryType::Update).starts_with(
            "UPDATE `users`\nSET\n  `created_at` = 'NOW()',\n  \
             `email` = 'john.doe@example.com',\n  `name` = 'John Doe',\n  `id` = 1\nWHERE"
        ));
        assert_eq!(
            generate_create_table_query("users", &cols),
            "CREATE TABLE IF NOT EXISTS `users` (\n  \
             `created_at` DATETIME,\n  \
             `email` VARCHAR(255) UNIQUE,\n  \
             `name` VARCHAR(255) NOT NULL,\n  \
             `id` INT PRIMARY KEY AUTO_INCREMENT\n);"
        );

        cols.swap(1, 3);
        for sql in [
            generate_query("users", &cols, QueryType::Insert),
            generate_query("users", &cols, QueryType::Update),
            generate_create_table_query("users", &cols),
        ] {
            let positions: Vec<usize> = cols
                .iter()
                .map(|c| sql.find(&format!("`{}`", c.name)).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", sql);
        }
    }

    #[test]
    fn test_missing_table_name() {
        for q in crate::schema::QUERY_TYPES {
            assert_eq!(generate_query("", &users(), q), MISSING_TABLE_NAME);
            assert_eq!(generate_query("   ", &[], q), MISSING_TABLE_NAME);
        }
    }

    #[test]
    fn test_unnamed_column_blocks_every_query_type() {
        let cols = vec![ColumnDefinition::new("", DataType::Int)];
        assert_eq!(
            generate_query("t", &cols, QueryType::Select),
            "-- Please ensure all columns have names."
        );

        let mut cols = users();
        cols.push(ColumnDefinition::new("  ", DataType::Text));
        for q in crate::schema::QUERY_TYPES {
            assert_eq!(generate_query("t", &cols, q), MISSING_COLUMN_NAMES);
        }
    }

    #[test]
    fn test_insert_formats_values_by_type() {
        assert_eq!(
            generate_query("users", &users(), QueryType::Insert),
            "INSERT INTO `users` (`id`, `name`, `email`, `created_at`) \
             VALUES (1, 'John Doe', 'john.doe@example.com', 'NOW()');"
        );
    }

    #[test]
    fn test_insert_defaults_for_empty_samples() {
        let cols = vec![
            ColumnDefinition::new("a", DataType::Int),
            ColumnDefinition::new("b", DataType::VarChar),
            ColumnDefinition::new("c", DataType::Boolean).with_sample("   "),
            ColumnDefinition::new("d", DataType::Decimal),
            ColumnDefinition::new("e", DataType::Date),
        ];
        assert_eq!(
            generate_query("t", &cols, QueryType::Insert),
            "INSERT INTO `t` (`a`, `b`, `c`, `d`, `e`) \
             VALUES (0, 'sample_value', TRUE, 0, 'sample_value');"
        );
    }

    #[test]
    fn test_insert_escapes_single_quotes() {
        let cols = vec![ColumnDefinition::new("name", DataType::VarChar).with_sample("O'Brien")];
        assert_eq!(
            generate_query("t", &cols, QueryType::Insert),
            "INSERT INTO `t` (`name`) VALUES ('O''Brien');"
        );
    }

    #[test]
    fn test_numeric_samples_are_emitted_verbatim() {
        let cols = vec![
            ColumnDefinition::new("n", DataType::Int).with_sample(" abc "),
            ColumnDefinition::new("f", DataType::Boolean).with_sample("false"),
        ];
        assert_eq!(
            generate_query("t", &cols, QueryType::Insert),
            "INSERT INTO `t` (`n`, `f`) VALUES (abc, false);"
        );
    }

    #[test]
    fn test_insert_and_update_need_columns() {
        assert_eq!(generate_query("t", &[], QueryType::Insert), INSERT_NEEDS_COLUMNS);
        assert_eq!(generate_query("t", &[], QueryType::Update), UPDATE_NEEDS_COLUMNS);
    }

    #[test]
    fn test_update_statement() {
        let cols = vec![
            ColumnDefinition::new("name", DataType::Text).with_sample("it's"),
            ColumnDefinition::new("age", DataType::Int),
            ColumnDefinition::new("active", DataType::Boolean),
            ColumnDefinition::new("nick", DataType::VarChar),
        ];
        assert_eq!(
            generate_query("people", &cols, QueryType::Update),
            "UPDATE `people`\nSET\n  `name` = 'it''s',\n  `age` = 0,\n  `active` = TRUE,\n  \
             `nick` = 'new_value'\nWHERE /* your condition here (e.g., id = 1) */;\n\
             -- Note: Always use a WHERE clause for UPDATE statements to avoid unintended data changes."
        );
    }

    #[test]
    fn test_update_always_has_where_placeholder() {
        let sql = generate_query("users", &users(), QueryType::Update);
        assert!(sql.contains("WHERE /* your condition here (e.g., id = 1) */;"));
        assert!(sql.ends_with("to avoid unintended data changes."));
    }

    #[test]
    fn test_delete_ignores_columns() {
        let expected = "DELETE FROM `users` WHERE /* your condition here (e.g., id = 1) */;\n\
             -- Note: Always use a WHERE clause for DELETE statements to avoid unintended data loss.";
        assert_eq!(generate_query("users", &[], QueryType::Delete), expected);
        assert_eq!(generate_query("users", &users(), QueryType::Delete), expected);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let cols = users();
        for q in crate::schema::QUERY_TYPES {
            assert_eq!(generate_query("users", &cols, q), generate_query("users", &cols, q));
        }
    }

    #[test]
    fn test_identifiers_are_not_trimmed_or_escaped() {
        let cols = vec![ColumnDefinition::new(" we`ird ", DataType::Int)];
        assert_eq!(
            generate_query(" t ", &cols, QueryType::Select),
            "SELECT ` we`ird ` FROM ` t ` LIMIT 0, 25;"
        );
    }

    #[test]
    fn test_duplicate_column_names_pass_through() {
        let cols = vec![
            ColumnDefinition::new("id", DataType::Int),
            ColumnDefinition::new("id", DataType::Int),
        ];
        assert_eq!(
            generate_query("t", &cols, QueryType::Select),
            "SELECT `id`, `id` FROM `t` LIMIT 0, 25;"
        );
    }

    #[test]
    fn test_generate_query_named() {
        assert_eq!(
            generate_query_named("users", &[], "select"),
            "SELECT * FROM `users` LIMIT 0, 25;"
        );
        assert_eq!(generate_query_named("users", &[], "UPSERT"), INVALID_QUERY_TYPE);
    }

    #[test]
    fn test_create_table() {
        let cols = vec![ColumnDefinition::new("id", DataType::Int)
            .with_constraints(&[Constraint::PrimaryKey, Constraint::AutoIncrement])];
        assert_eq!(
            generate_create_table_query("users", &cols),
            "CREATE TABLE IF NOT EXISTS `users` (\n  `id` INT PRIMARY KEY AUTO_INCREMENT\n);"
        );
    }

    #[test]
    fn test_create_table_full_definition() {
        assert_eq!(
            generate_create_table_query("users", &users()),
            "CREATE TABLE IF NOT EXISTS `users` (\n  \
             `id` INT PRIMARY KEY AUTO_INCREMENT,\n  \
             `name` VARCHAR(255) NOT NULL,\n  \
             `email` VARCHAR(255) UNIQUE,\n  \
             `created_at` DATETIME\n);"
        );
    }

    #[test]
    fn test_create_table_skips_unnamed_columns() {
        let cols = vec![
            ColumnDefinition::new("", DataType::Text),
            ColumnDefinition::new("price", DataType::Decimal),
        ];
        assert_eq!(
            generate_create_table_query("items", &cols),
            "CREATE TABLE IF NOT EXISTS `items` (\n  `price` DECIMAL(10,2)\n);"
        );
    }

    #[test]
    fn test_create_table_advisories() {
        assert_eq!(generate_create_table_query(" ", &users()), MISSING_TABLE_NAME);
        assert_eq!(
            generate_create_table_query("t", &[]),
            "-- Please add and define columns for table t."
        );
        let unnamed = vec![ColumnDefinition::default(), ColumnDefinition::default()];
        assert_eq!(
            generate_create_table_query("t", &unnamed),
            "-- Please add and define columns for table t."
        );
    }

    #[test]
    fn test_is_advisory() {
        assert!(is_advisory(MISSING_TABLE_NAME));
        assert!(!is_advisory(&generate_query("t", &[], QueryType::Select)));
    }
}
