#[macro_use]
mod errors;
mod assistant;
mod command;
mod config;
mod generator;
mod repl;
mod saved;
mod schema;
mod session;
mod state;
mod storage;
mod tokenizer;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "querycraft",
    version = VERSION,
    about = "Terminal SQL query builder."
)]
struct Cli {
    /// Execute a command.
    #[arg(short, long)]
    command: Option<String>,

    /// Directory for builder state and saved queries.
    #[arg(long, env = "QUERYCRAFT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep state in memory only.
    #[arg(long)]
    ephemeral: bool,

    /// Shell command used as the SQL assistant; reads a prompt on stdin.
    #[arg(long, env = "QUERYCRAFT_ASSISTANT_CMD")]
    assistant_cmd: Option<String>,

    /// Log filter, e.g. `info` or `querycraft=debug`.
    #[arg(long, env = "QUERYCRAFT_LOG", default_value = "warn")]
    log: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = match config::Config::resolve(cli.data_dir, cli.ephemeral, cli.assistant_cmd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(line) = cli.command {
        return match run_once(&config, &line) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    match repl::start(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs a single shell command and prints its output.
fn run_once(config: &config::Config, line: &str) -> Result<(), errors::Error> {
    let mut session = session::Session::open(config)?;
    let output = command::execute(&mut session, command::parse(line)?)?;
    session.close();
    if output.is_error {
        for line in &output.lines {
            eprintln!("{}", line);
        }
    } else {
        for line in &output.lines {
            println!("{}", line);
        }
    }
    Ok(())
}
