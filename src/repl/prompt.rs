use super::buffer::Buffer;
use super::status::StatusBar;
use crossterm::{
    cursor,
    event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::{self, Color, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;

const NAME: &str = env!("CARGO_PKG_NAME");

/// Command keywords offered by tab completion.
const COMPLETIONS: &[&str] = &[
    "help", "show", "table", "add", "set", "rename-column", "sample", "toggle", "drop", "move",
    "type", "gen", "create", "save", "saved", "load", "rename", "delete", "export", "ask",
    "simulate", "theme", "version", "quit", "select", "insert", "update", "light", "dark",
];

/// A terminal prompt handling line editing and command history.
#[derive(Debug)]
pub struct Prompt {
    pub x: u16,        // Cursor position within the input
    pub prompt_y: u16, // Prompt row
    color: Color,
    history: Vec<String>,
    history_path: Option<PathBuf>,
    history_index: usize,
}

impl Prompt {
    /// Creates a prompt, loading history from `history_path` when given.
    pub fn new(history_path: Option<PathBuf>) -> Self {
        let history = history_path
            .as_deref()
            .map(super::history::load_history)
            .unwrap_or_default();
        let history_index = history.len();

        Self {
            x: 0,
            prompt_y: 0,
            color: Color::Green,
            history,
            history_path,
            history_index,
        }
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Appends a line to the command history and saves it to the history file.
    pub fn append_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.history.push(line.trim().to_string());
        self.history_index = self.history.len();
        if let Some(path) = &self.history_path {
            if let Err(e) = super::history::append_history(line, path) {
                warn!(path = %path.display(), "Failed to save history: {}", e);
            }
        }
    }

    /// Starts a new prompt on a new line.
    pub fn start_prompt(&mut self) -> io::Result<()> {
        self.x = 0;
        self.history_index = self.history.len();
        self.prompt_y = super::console::scroll_maybe(1)?;
        self.render_prompt()
    }

    /// Redraws the prompt in place, clearing any input.
    fn clear_prompt(&mut self) -> io::Result<()> {
        self.render_prompt()
    }

    fn render_prompt(&self) -> io::Result<()> {
        execute!(
            io::stdout(),
            cursor::MoveTo(0, self.prompt_y),
            style::SetAttribute(style::Attribute::Bold),
            SetForegroundColor(self.color),
            style::Print(format!("{}> ", NAME)),
            style::SetAttribute(style::Attribute::Reset),
            style::ResetColor,
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )
    }

    /// Column of input position `x` on the prompt row.
    fn column(x: u16) -> u16 {
        (NAME.len() + 2) as u16 + x
    }

    /// Scrolls the terminal if the input would run past the last usable row.
    fn scroll_prompt_if_needed(&mut self, input: &str) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let wraps = Self::column(input.chars().count() as u16) / width.max(1) + 1;

        if self.prompt_y + wraps >= height {
            let to_scroll = (self.prompt_y + wraps - height + 1).max(1);
            self.prompt_y = self.prompt_y.saturating_sub(to_scroll);
            execute!(
                io::stdout(),
                terminal::ScrollUp(to_scroll),
                cursor::MoveToRow(self.prompt_y)
            )?;
        }
        Ok(())
    }

    /// Reads one line of input with editing, history and completion.
    ///
    /// # Errors
    /// Returns `io::ErrorKind::Interrupted` on Ctrl-D, or Ctrl-C on an empty line.
    pub fn readline(&mut self, buffer: &mut Buffer, status: &mut StatusBar) -> io::Result<()> {
        loop {
            if let event::Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            {
                match (code, modifiers) {
                    (KeyCode::Enter, _) => break,
                    (KeyCode::Up, _) if self.history_index > 0 => {
                        self.handle_history(buffer, -1)?;
                    }
                    (KeyCode::Down, _) => {
                        self.handle_history(buffer, 1)?;
                    }
                    (KeyCode::Backspace, _) => {
                        self.handle_backspace(buffer)?;
                    }
                    (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                        self.handle_interrupt(buffer)?;
                    }
                    (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                        return Err(io::Error::new(io::ErrorKind::Interrupted, "Ctrl-D"));
                    }
                    (KeyCode::Char('l'), KeyModifiers::CONTROL) => {
                        self.handle_clear_screen(buffer)?;
                    }
                    (KeyCode::Left, _) if self.x > 0 => {
                        self.x -= 1;
                        self.move_cursor()?;
                    }
                    (KeyCode::Right, _) if (self.x as usize) < buffer.len() => {
                        self.x += 1;
                        self.move_cursor()?;
                    }
                    (KeyCode::Home, _) => {
                        self.x = 0;
                        self.move_cursor()?;
                    }
                    (KeyCode::End, _) => {
                        self.x = buffer.len() as u16;
                        self.move_cursor()?;
                    }
                    (KeyCode::Tab, _) => {
                        self.handle_tab_completion(buffer)?;
                    }
                    (KeyCode::Char(c), _) => {
                        self.handle_char_input(buffer, c)?;
                    }
                    _ => {}
                }
            }
            status.set_cursor(self.x);
            status.draw()?;
        }
        Ok(())
    }

    /// Handles history navigation (up/down arrow keys).
    fn handle_history(&mut self, buffer: &mut Buffer, delta: isize) -> io::Result<()> {
        let new_index = (self.history_index as isize + delta).clamp(0, self.history.len() as isize);
        self.history_index = new_index as usize;

        match self.history.get(self.history_index) {
            Some(line) => buffer.set(line),
            None => buffer.clear(),
        }
        self.redraw(buffer)?;
        self.x = buffer.len() as u16;
        Ok(())
    }

    /// Clears a non-empty line, or ends the session on an empty one.
    fn handle_interrupt(&mut self, buffer: &mut Buffer) -> io::Result<()> {
        if buffer.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "Ctrl-C"));
        }
        buffer.clear();
        self.x = 0;
        self.clear_prompt()
    }

    fn handle_clear_screen(&mut self, buffer: &Buffer) -> io::Result<()> {
        execute!(
            io::stdout(),
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        self.prompt_y = 0;
        self.redraw(buffer)
    }

    /// Completes the last word when exactly one keyword matches it.
    fn handle_tab_completion(&mut self, buffer: &mut Buffer) -> io::Result<()> {
        if (self.x as usize) < buffer.len() {
            return Ok(());
        }
        let input = buffer.as_str().to_string();
        if input.ends_with(char::is_whitespace) {
            return Ok(());
        }
        if let Some(last_word) = input.split_whitespace().last() {
            let lower = last_word.to_lowercase();
            let matches: Vec<_> = COMPLETIONS.iter().filter(|c| c.starts_with(&lower)).collect();
            if let [only] = matches.as_slice() {
                let completed = &only[lower.len()..];
                buffer.push_str(completed);
                self.x += completed.chars().count() as u16;
                write!(io::stdout(), "{}", completed)?;
                io::stdout().flush()?;
            }
        }
        Ok(())
    }

    fn handle_char_input(&mut self, buffer: &mut Buffer, c: char) -> io::Result<()> {
        if (self.x as usize) < buffer.len() {
            buffer.insert(self.x as usize, c);
            self.x += 1;
            self.redraw(buffer)?;
        } else {
            buffer.push(c);
            self.x += 1;
            write!(io::stdout(), "{}", c)?;
            io::stdout().flush()?;
        }
        Ok(())
    }

    fn handle_backspace(&mut self, buffer: &mut Buffer) -> io::Result<()> {
        if self.x > 0 {
            buffer.remove(self.x as usize - 1);
            self.x -= 1;
            self.redraw(buffer)?;
        }
        Ok(())
    }

    /// Redraws the whole input and restores the cursor.
    fn redraw(&mut self, buffer: &Buffer) -> io::Result<()> {
        self.scroll_prompt_if_needed(buffer.as_str())?;
        self.clear_prompt()?;
        write!(io::stdout(), "{}", buffer.as_str())?;
        io::stdout().flush()?;
        self.move_cursor()
    }

    /// Places the terminal cursor at input position `self.x`, following wraps.
    fn move_cursor(&self) -> io::Result<()> {
        let (width, _) = terminal::size()?;
        let width = width.max(1);
        let offset = Self::column(self.x);
        execute!(
            io::stdout(),
            cursor::MoveTo(offset % width, self.prompt_y + offset / width)
        )
    }
}
