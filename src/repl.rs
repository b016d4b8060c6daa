//! Interactive shell running in raw terminal mode.

mod buffer;
mod console;
mod history;
mod prompt;
mod status;

pub use console::start;
