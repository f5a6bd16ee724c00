//! Line-oriented command interpreter over a [`Table`].
//!
//! Statements are `insert <id> <username> <email>` and `select`; lines that
//! start with `.` are meta commands. Output goes to any `Write` so the REPL
//! and the tests share one code path.

use std::io::Write;

use crate::{
    storage::{
        node::{
            COMMON_NODE_HEADER_SIZE, INTERNAL_NODE_HEADER_SIZE, INTERNAL_NODE_MAX_CELLS,
            LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
            LEAF_NODE_SPACE_FOR_CELLS,
        },
        table::Table,
    },
    types::{
        error::{DatabaseError, Result},
        row::ROW_SIZE,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert {
        id: i64,
        username: String,
        email: String,
    },
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareError {
    SyntaxError,
    UnrecognizedStatement,
}

pub fn prepare_statement(line: &str) -> std::result::Result<Statement, PrepareError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("insert") => {
            let (Some(id), Some(username), Some(email), None) =
                (tokens.next(), tokens.next(), tokens.next(), tokens.next())
            else {
                return Err(PrepareError::SyntaxError);
            };
            let id = id.parse::<i64>().map_err(|_| PrepareError::SyntaxError)?;
            Ok(Statement::Insert {
                id,
                username: username.to_string(),
                email: email.to_string(),
            })
        }
        Some("select") if tokens.next().is_none() => Ok(Statement::Select),
        _ => Err(PrepareError::UnrecognizedStatement),
    }
}

/// Runs one input line. Rejected rows are reported on `out` and leave the
/// table untouched; only I/O and corruption errors are returned.
pub fn execute_line<W: Write>(table: &mut Table, line: &str, out: &mut W) -> Result<Flow> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Flow::Continue);
    }
    if line.starts_with('.') {
        return do_meta_command(table, line, out);
    }

    match prepare_statement(line) {
        Ok(statement) => execute_statement(table, statement, out)?,
        Err(PrepareError::SyntaxError) => writeln!(out, "Syntax error.")?,
        Err(PrepareError::UnrecognizedStatement) => {
            writeln!(out, "Unrecognized keyword at start of '{}'.", line)?
        }
    }
    Ok(Flow::Continue)
}

/// Feeds `lines` through the interpreter until `.exit` or end of input, then
/// closes the table. The table is closed even when a line fails, and the
/// first error wins.
pub fn run_session<I, W>(mut table: Table, lines: I, out: &mut W) -> Result<()>
where
    I: IntoIterator<Item = String>,
    W: Write,
{
    let outcome = drive_session(&mut table, lines, out);
    let closed = table.close();
    outcome.and(closed)
}

fn drive_session<I, W>(table: &mut Table, lines: I, out: &mut W) -> Result<()>
where
    I: IntoIterator<Item = String>,
    W: Write,
{
    for line in lines {
        let flow = execute_line(table, &line, out)?;
        out.flush()?;
        if flow == Flow::Exit {
            break;
        }
    }
    Ok(())
}

pub fn execute_statement<W: Write>(
    table: &mut Table,
    statement: Statement,
    out: &mut W,
) -> Result<()> {
    match statement {
        Statement::Insert {
            id,
            username,
            email,
        } => match table.insert(id, &username, &email) {
            Ok(()) => writeln!(out, "Executed.")?,
            Err(DatabaseError::NegativeId { .. }) => writeln!(out, "ID must be positive.")?,
            Err(DatabaseError::IdTooLarge { .. }) => writeln!(out, "ID is too large.")?,
            Err(DatabaseError::FieldTooLong { .. }) => writeln!(out, "String is too long.")?,
            Err(DatabaseError::DuplicateKey { .. }) => writeln!(out, "Error: Duplicate key.")?,
            Err(DatabaseError::TableFull) => writeln!(out, "Error: Table full.")?,
            Err(other) => return Err(other),
        },
        Statement::Select => {
            for row in table.select()? {
                writeln!(out, "{}", row?)?;
            }
            writeln!(out, "Executed.")?;
        }
    }
    Ok(())
}

fn do_meta_command<W: Write>(table: &mut Table, line: &str, out: &mut W) -> Result<Flow> {
    match line {
        ".exit" => return Ok(Flow::Exit),
        ".btree" => {
            writeln!(out, "Tree:")?;
            write!(out, "{}", table.render_tree()?)?;
        }
        ".constants" => {
            writeln!(out, "Constants:")?;
            print_constants(table, out)?;
        }
        ".help" => {
            writeln!(
                out,
                r#"Available commands:
  insert <id> <username> <email>  - Store a row (id > 0, username <= 32 bytes, email <= 255 bytes)
  select                          - Print every row in id order
  .btree                          - Print the tree structure
  .constants                      - Print storage layout constants
  .help                           - Show this help message
  .exit                           - Flush to disk and exit"#
            )?;
        }
        _ => writeln!(out, "Unrecognized command '{}'", line)?,
    }
    Ok(Flow::Continue)
}

fn print_constants<W: Write>(table: &Table, out: &mut W) -> Result<()> {
    writeln!(out, "ROW_SIZE: {}", ROW_SIZE)?;
    writeln!(out, "COMMON_NODE_HEADER_SIZE: {}", COMMON_NODE_HEADER_SIZE)?;
    writeln!(out, "LEAF_NODE_HEADER_SIZE: {}", LEAF_NODE_HEADER_SIZE)?;
    writeln!(out, "LEAF_NODE_CELL_SIZE: {}", LEAF_NODE_CELL_SIZE)?;
    writeln!(out, "LEAF_NODE_SPACE_FOR_CELLS: {}", LEAF_NODE_SPACE_FOR_CELLS)?;
    writeln!(out, "LEAF_NODE_MAX_CELLS: {}", LEAF_NODE_MAX_CELLS)?;
    writeln!(out, "INTERNAL_NODE_HEADER_SIZE: {}", INTERNAL_NODE_HEADER_SIZE)?;
    writeln!(out, "INTERNAL_NODE_MAX_CELLS: {}", INTERNAL_NODE_MAX_CELLS)?;
    writeln!(out, "INTERNAL_MAX_KEYS: {}", table.config().internal_max_keys)?;
    writeln!(out, "MAX_PAGES: {}", table.config().max_pages)?;
    Ok(())
}
