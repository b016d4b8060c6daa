use crate::state::{AppState, Theme};
use crossterm::{
    cursor, execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};

/// Terminal colours for a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub prompt: Color,
    pub bar_fg: Color,
    pub bar_bg: Color,
    pub error: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                prompt: Color::Green,
                bar_fg: Color::White,
                bar_bg: Color::DarkGrey,
                error: Color::Red,
            },
            Theme::Dark => Palette {
                prompt: Color::Cyan,
                bar_fg: Color::Black,
                bar_bg: Color::Grey,
                error: Color::Red,
            },
        }
    }
}

/// Builder summary drawn on the last terminal row.
#[derive(Debug, Default)]
pub struct StatusBar {
    table: String,
    columns: usize,
    query_type: String,
    editing: Option<String>,
    theme: Theme,
    col: u16,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes the builder fields from the state.
    pub fn update(&mut self, state: &AppState) {
        self.table = state.table_name().to_string();
        self.columns = state.columns().len();
        self.query_type = state.query_type().to_string();
        self.editing = state
            .editing_query_id()
            .map(|_| state.current_query_name().to_string());
        self.theme = state.theme();
    }

    pub fn set_cursor(&mut self, col: u16) {
        self.col = col;
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(self.theme)
    }

    /// Formats the status bar content, truncated with an ellipsis to `width`.
    fn format(&self, width: u16) -> String {
        let table = if self.table.trim().is_empty() { "-" } else { self.table.as_str() };
        let mut status_text = format!(
            "Table: {} | Columns: {} | {} | Col {}",
            table,
            self.columns,
            self.query_type,
            self.col + 1,
        );
        if let Some(name) = &self.editing {
            status_text.push_str(&format!(" | Editing: {}", name));
        }

        let width = width as usize;
        if status_text.chars().count() > width {
            let take_len = width.saturating_sub(3);
            format!(
                "{}...",
                status_text.chars().take(take_len).collect::<String>()
            )
        } else {
            status_text
        }
    }

    /// Draws the status bar at the bottom of the terminal.
    ///
    /// # Errors
    /// Returns an `io::Error` if terminal operations (e.g., size query, cursor movement) fail
    pub fn draw(&self) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let formatted = self.format(width);
        let full_line = format!("{:<width$}", formatted, width = width as usize);
        let palette = self.palette();

        execute!(
            io::stdout(),
            cursor::SavePosition,
            cursor::MoveTo(0, height.saturating_sub(1)),
            terminal::Clear(terminal::ClearType::CurrentLine),
            SetForegroundColor(palette.bar_fg),
            SetBackgroundColor(palette.bar_bg),
            SetAttribute(Attribute::Bold),
            Print(&full_line),
            ResetColor,
            SetAttribute(Attribute::Reset),
            cursor::RestorePosition,
        )?;
        io::stdout().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn bar() -> (AppState, StatusBar) {
        let state = AppState::load(Arc::new(MemoryStore::new()));
        let mut bar = StatusBar::new();
        bar.update(&state);
        (state, bar)
    }

    #[test]
    fn test_format_shows_builder_summary() {
        let (_, bar) = bar();
        assert_eq!(
            bar.format(80),
            "Table: my_table | Columns: 4 | SELECT | Col 1"
        );
    }

    #[test]
    fn test_format_shows_editing_name() {
        let (mut state, mut bar) = bar();
        state.set_current_query_name("Users");
        let saved = state.save_query().unwrap();
        state.load_saved(&saved.id).unwrap();
        bar.update(&state);
        assert!(bar.format(120).ends_with("| Editing: Users"));
    }

    #[test]
    fn test_format_truncation() {
        let (_, mut bar) = bar();
        bar.set_cursor(41);
        let formatted = bar.format(20);
        assert_eq!(formatted.chars().count(), 20);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_palette_follows_theme() {
        let (mut state, mut bar) = bar();
        assert_eq!(bar.palette().prompt, Color::Green);
        state.set_theme(Theme::Dark);
        bar.update(&state);
        assert_eq!(bar.palette(), Palette::for_theme(Theme::Dark));
    }

    #[test]
    fn test_errors_are_red_in_every_theme() {
        assert_eq!(Palette::for_theme(Theme::Light).error, Color::Red);
        assert_eq!(Palette::for_theme(Theme::Dark).error, Color::Red);
    }
}
