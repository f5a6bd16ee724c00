use bincode::{Decode, Encode, config::Config};

use crate::{
    storage::{G2DB_FORMAT_VERSION, G2DB_MAGIC},
    types::{
        PAGE_SIZE, PageNum,
        error::{DatabaseError, Result},
        page::Page,
    },
    utils::hash::{calculate_checksum, verify_checksum},
};

/// Encoded width of the header fields; the CRC32 follows immediately.
pub const HEADER_FIELDS_SIZE: usize = 44;
pub const HEADER_CHECKSUM_OFFSET: usize = HEADER_FIELDS_SIZE;

/// Contents of page 0. Designates the root page of the tree and records
/// enough bookkeeping to sanity-check the file on open.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FileHeader {
    pub magic: [u8; 16],
    pub page_size: u32,
    pub format_version: u32,
    pub root_page: PageNum,
    pub page_count: u32,
    pub row_count: u64,
    pub change_counter: u32,
}

fn encoding() -> impl Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

impl FileHeader {
    pub fn new(root_page: PageNum, page_count: u32) -> Self {
        Self {
            magic: *G2DB_MAGIC,
            page_size: PAGE_SIZE as u32,
            format_version: G2DB_FORMAT_VERSION,
            root_page,
            page_count,
            row_count: 0,
            change_counter: 0,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; HEADER_FIELDS_SIZE + 4];
        let written = bincode::encode_into_slice(self, &mut buffer[..HEADER_FIELDS_SIZE], encoding())
            .map_err(|e| DatabaseError::SerializationError {
                details: format!("header encode failed: {}", e),
            })?;
        if written != HEADER_FIELDS_SIZE {
            return Err(DatabaseError::SerializationError {
                details: format!("header encoded to {} bytes, expected {}", written, HEADER_FIELDS_SIZE),
            });
        }
        let checksum = calculate_checksum(&buffer[..HEADER_FIELDS_SIZE]);
        buffer[HEADER_CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());
        Ok(buffer)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_FIELDS_SIZE + 4 {
            return Err(corrupt("header too short"));
        }

        let stored_checksum = u32::from_le_bytes([
            bytes[HEADER_CHECKSUM_OFFSET],
            bytes[HEADER_CHECKSUM_OFFSET + 1],
            bytes[HEADER_CHECKSUM_OFFSET + 2],
            bytes[HEADER_CHECKSUM_OFFSET + 3],
        ]);
        if !verify_checksum(&bytes[..HEADER_FIELDS_SIZE], stored_checksum) {
            return Err(corrupt("header checksum mismatch"));
        }

        let (header, _): (FileHeader, usize) =
            bincode::decode_from_slice(&bytes[..HEADER_FIELDS_SIZE], encoding()).map_err(|e| {
                DatabaseError::CorruptFile {
                    reason: format!("header decode failed: {}", e),
                }
            })?;

        if &header.magic != G2DB_MAGIC {
            return Err(corrupt("invalid magic number"));
        }
        if header.page_size != PAGE_SIZE as u32 {
            return Err(DatabaseError::CorruptFile {
                reason: format!("unsupported page size: {}", header.page_size),
            });
        }
        if header.format_version != G2DB_FORMAT_VERSION {
            return Err(DatabaseError::CorruptFile {
                reason: format!("unsupported format version: {}", header.format_version),
            });
        }
        Ok(header)
    }

    pub fn read_from(page: &Page) -> Result<Self> {
        Self::from_bytes(page.as_bytes())
    }

    /// Overwrite the page with this header, zeroing everything after it.
    pub fn write_to(&self, page: &mut Page) -> Result<()> {
        let bytes = self.to_bytes()?;
        let buffer = page.as_bytes_mut();
        buffer.fill(0);
        buffer[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }
}

fn corrupt(reason: &str) -> DatabaseError {
    DatabaseError::CorruptFile {
        reason: reason.to_string(),
    }
}
