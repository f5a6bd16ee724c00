use thiserror::Error;

use crate::types::{Key, PageNum};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ID must be positive (got {id})")]
    NegativeId { id: i64 },

    #[error("ID {id} does not fit in 32 bits")]
    IdTooLarge { id: i64 },

    #[error("Field '{field}' is too long: {actual} bytes (max: {max})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Duplicate key {key}")]
    DuplicateKey { key: Key },

    #[error("Table full")]
    TableFull,

    #[error("Corrupt database file: {reason}")]
    CorruptFile { reason: String },

    #[error("Page {page_num} is out of bounds (max pages: {max_pages})")]
    PageOutOfBounds { page_num: PageNum, max_pages: u32 },

    #[error("Corrupted page: page_num={page_num}, reason={reason}")]
    CorruptedPage { page_num: PageNum, reason: String },

    #[error("Invalid node type: {0}")]
    InvalidNodeType(u8),

    #[error("Serialization/deserialization error: {details}")]
    SerializationError { details: String },

    #[error("Cursor is past the end of the table")]
    CursorExhausted,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
