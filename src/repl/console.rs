use super::{buffer, prompt, status};
use crate::{command, config::Config, errors, session};
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use std::io::{self, Write};
use std::sync::Once;
use tracing::{error, info};

static INIT: Once = Once::new();

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

const BANNER: &str = r#"
Design a table, pick a query type and the statement is regenerated as you go.
Type 'help' for the list of commands, 'quit' to leave.
"#;

/// Starts a REPL session in raw console mode.
///
/// # Returns
/// A `Result` indicating success or an `errors::Error` if initialization or cleanup fails.
pub fn start(config: &Config) -> Result<(), errors::Error> {
    let mut session = session::Session::open(config)?;
    info!(session_id = %session.id, "Starting REPL session...");

    terminal::enable_raw_mode()?;
    execute!(io::stdout(), cursor::EnableBlinking)?;

    INIT.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            if let Err(e) = terminal::disable_raw_mode() {
                eprintln!("Failed to disable raw mode during panic: {}", e);
            }
            eprintln!("Panic occurred: {:?}", info);
        }));
    });

    let mut console = Console::new(&mut session, config);
    let result = console.start();

    terminal::disable_raw_mode()?;
    if let Err(e) = &result {
        error!(session_id = %session.id, "REPL stopped: {}", e);
    }
    session.close();

    info!("REPL session ended.");
    result
}

struct Console<'a> {
    session: &'a mut session::Session,
    prompt: prompt::Prompt,
    status: status::StatusBar,
    buffer: buffer::Buffer,
}

impl<'a> Console<'a> {
    fn new(session: &'a mut session::Session, config: &Config) -> Self {
        Self {
            session,
            prompt: prompt::Prompt::new(config.history_path.clone()),
            status: status::StatusBar::new(),
            buffer: buffer::Buffer::new(),
        }
    }

    fn draw(&self) -> io::Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        io::stdout().flush()?;
        Ok(())
    }

    /// Runs the read-eval-print loop until `quit`, Ctrl-D or Ctrl-C.
    fn start(&mut self) -> Result<(), errors::Error> {
        self.draw()?;
        echo_line(format!("Welcome to {} {}.", NAME, VERSION))?;
        echo_lines(BANNER)?;
        echo_lines(self.session.state.generated_query())?;

        loop {
            self.buffer.clear();
            self.update_status()?;
            self.prompt.start_prompt()?;

            match self.prompt.readline(&mut self.buffer, &mut self.status) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => break,
                Err(e) => return Err(e.into()),
            }

            let input = self.buffer.build();
            next_line()?;
            if input.is_empty() {
                continue;
            }
            self.prompt.append_line(&input);
            if !self.handle_input(&input)? {
                break;
            }
        }

        next_line()?;
        echo_line("Bye".to_string())?;
        Ok(())
    }

    /// Redraws the status bar and prompt colour from the current state.
    fn update_status(&mut self) -> io::Result<()> {
        self.status.update(&self.session.state);
        self.prompt.set_color(self.status.palette().prompt);
        self.status.draw()
    }

    /// Runs one command line; returns `false` when the shell should exit.
    fn handle_input(&mut self, input: &str) -> Result<bool, errors::Error> {
        let command = match command::parse(input) {
            Ok(command::Command::Quit) => return Ok(false),
            Ok(command) => command,
            Err(e) => {
                echo_error(e.to_string(), self.status.palette().error)?;
                return Ok(true);
            }
        };

        let changes = self.session.state.sync();
        if changes > 0 {
            info!(session_id = %self.session.id, changes, "Applied changes from another session.");
        }

        let error_color = self.status.palette().error;
        match command::execute(self.session, command) {
            Ok(output) if output.is_error => echo_error(output.lines.join("\n"), error_color)?,
            Ok(output) => echo_lines(&output.lines.join("\n"))?,
            Err(e) => echo_error(e.to_string(), error_color)?,
        }
        Ok(true)
    }
}

/// Echoes a string to the console at the current scroll position.
pub fn echo_line(s: String) -> io::Result<()> {
    scroll_maybe(1)?;
    execute!(
        io::stdout(),
        cursor::MoveToColumn(0),
        Print(s),
        terminal::Clear(terminal::ClearType::UntilNewLine),
        Print("\r\n"),
    )?;
    io::stdout().flush()?;
    Ok(())
}

/// Echoes a message in the palette's error colour (red), one row per line.
pub fn echo_error(s: String, color: Color) -> io::Result<()> {
    execute!(io::stdout(), SetForegroundColor(color))?;
    let result = echo_lines(&s);
    execute!(io::stdout(), ResetColor)?;
    result
}

/// Echoes multiple lines, scrolling above the status bar as needed.
pub fn echo_lines(s: &str) -> io::Result<()> {
    for line in s.lines() {
        scroll_maybe(1)?;
        execute!(
            io::stdout(),
            cursor::MoveToColumn(0),
            Print(line),
            terminal::Clear(terminal::ClearType::UntilNewLine),
            Print("\r\n")
        )?;
    }
    io::stdout().flush()?;
    Ok(())
}

/// Moves the cursor to the next line in the terminal.
pub fn next_line() -> io::Result<()> {
    scroll_maybe(1)?;
    execute!(io::stdout(), Print("\r\n"))?;
    Ok(())
}

/// Scrolls the terminal if necessary, reserving lines at the bottom.
///
/// # Returns
/// The adjusted cursor Y position after scrolling.
pub fn scroll_maybe(reserved_lines: u16) -> io::Result<u16> {
    let (_, y) = cursor::position()?;
    let (_, height) = terminal::size()?;
    let dest = y + reserved_lines;
    if dest >= height {
        let to_scroll = (dest - height + 1).max(1);
        execute!(
            io::stdout(),
            terminal::ScrollUp(to_scroll),
            cursor::MoveToRow(y.saturating_sub(to_scroll))
        )?;
        Ok(y.saturating_sub(to_scroll))
    } else {
        Ok(y)
    }
}
