use std::{path::PathBuf, process::ExitCode};

use g2db::{
    interpreter::run_session,
    storage::{config::StorageConfig, table::Table},
    types::error::DatabaseError,
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::error;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "g2db> ";
const DEFAULT_DB_PATH: &str = "g2db.db";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(path: PathBuf) -> Result<(), DatabaseError> {
    let config = StorageConfig::from_env()?;
    let table = Table::open_with_config(&path, config)?;

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            table.close()?;
            return Err(DatabaseError::Io(std::io::Error::other(err.to_string())));
        }
    };

    let lines = std::iter::from_fn(|| match rl.readline(PROMPT) {
        Ok(line) => {
            if !line.trim().is_empty() {
                let _ = rl.add_history_entry(line.as_str());
            }
            Some(line)
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
        Err(err) => {
            error!(%err, "failed to read input");
            None
        }
    });

    run_session(table, lines, &mut std::io::stdout())
}

fn main() -> ExitCode {
    init_tracing();
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
