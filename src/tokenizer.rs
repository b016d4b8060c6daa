use crate::errors;

/// Splits a command line into tokens, respecting spaces inside parentheses and quotes.
///
/// A token that is wholly wrapped in single quotes is returned without them,
/// so `'John Doe'` yields `John Doe`, and `''` inside it collapses to `'`.
/// Quotes inside an unwrapped token are kept.
///
/// # Arguments
/// * `line` - The raw command text to split.
///
/// # Returns
/// A `Result` containing the tokens or an `errors::Error` if a parenthesis or quote is unbalanced.
pub fn tokenize(line: &str) -> Result<Vec<String>, errors::Error> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut inside_text = false;

    for c in line.chars() {
        match c {
            '\'' => {
                inside_text = !inside_text;
                current.push(c);
            }
            '(' if !inside_text => {
                depth += 1;
                current.push(c);
            }
            ')' if !inside_text => {
                if depth == 0 {
                    return Err(err!(Syntax, "Unmatched closing parenthesis."));
                }
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 && !inside_text => {
                if !current.is_empty() {
                    result.push(unquote(&current));
                    current.clear();
                }
            }
            _ => current.push(c),
        }
    }

    if depth > 0 {
        return Err(err!(Syntax, "Missing closing parenthesis."));
    }
    if inside_text {
        return Err(err!(Syntax, "Unclosed text literal."));
    }
    if !current.is_empty() {
        result.push(unquote(&current));
    }

    Ok(result)
}

fn unquote(token: &str) -> String {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        token[1..token.len() - 1].replace("''", "'")
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_parenthesised_types_together() {
        let tokens = tokenize("add price DECIMAL(10, 2) NOT NULL").unwrap();
        assert_eq!(
            tokens,
            vec!["add", "price", "DECIMAL(10, 2)", "NOT", "NULL"]
        );
    }

    #[test]
    fn test_tokenize_strips_whole_token_quotes() {
        let tokens = tokenize("rename 2 'Active users'").unwrap();
        assert_eq!(tokens, vec!["rename", "2", "Active users"]);
    }

    #[test]
    fn test_tokenize_collapses_doubled_quotes() {
        let tokens = tokenize("sample 1 'it''s' O''Brien").unwrap();
        assert_eq!(tokens, vec!["sample", "1", "it's", "O''Brien"]);
    }

    #[test]
    fn test_tokenize_rejects_unbalanced_input() {
        assert_eq!(tokenize("add x VARCHAR(255").unwrap_err().code(), 3000);
        assert_eq!(tokenize("add x INT)").unwrap_err().code(), 3000);
        assert_eq!(tokenize("save 'oops").unwrap_err().code(), 3000);
    }

    #[test]
    fn test_tokenize_empty_line() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
