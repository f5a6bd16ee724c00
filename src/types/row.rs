use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{
    COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, Key,
    error::{DatabaseError, Result},
};

/*
 * Row Layout (fixed width, little-endian)
 * ┌──────────┬──────────────┬────────────────┬───────────┬─────────────────┐
 * │ id (4)   │ user_len (1) │ username (32)  │ email_len │ email (255)     │
 * │          │              │ zero padded    │ (1)       │ zero padded     │
 * └──────────┴──────────────┴────────────────┴───────────┴─────────────────┘
 */
pub const ID_SIZE: usize = std::mem::size_of::<Key>();
pub const LENGTH_PREFIX_SIZE: usize = 1;
pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const USERNAME_SIZE: usize = LENGTH_PREFIX_SIZE + COLUMN_USERNAME_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;
pub const EMAIL_SIZE: usize = LENGTH_PREFIX_SIZE + COLUMN_EMAIL_SIZE;
pub const ROW_SIZE: usize = EMAIL_OFFSET + EMAIL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: Key,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: Key, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Build a row from unchecked interpreter input, rejecting ids that are not
    /// positive 32-bit values and fields that exceed their column capacity.
    pub fn try_new(id: i64, username: &str, email: &str) -> Result<Self> {
        if id <= 0 {
            return Err(DatabaseError::NegativeId { id });
        }
        let id = Key::try_from(id).map_err(|_| DatabaseError::IdTooLarge { id })?;
        let row = Self::new(id, username, email);
        row.validate()?;
        Ok(row)
    }

    pub fn validate(&self) -> Result<()> {
        check_field("username", &self.username, COLUMN_USERNAME_SIZE)?;
        check_field("email", &self.email, COLUMN_EMAIL_SIZE)?;
        Ok(())
    }

    pub fn serialize_into(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() < ROW_SIZE {
            return Err(DatabaseError::SerializationError {
                details: format!("Row buffer too small: {} < {}", dst.len(), ROW_SIZE),
            });
        }
        self.validate()?;

        let dst = &mut dst[..ROW_SIZE];
        dst.fill(0);
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_field(&mut dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE], &self.username);
        write_field(&mut dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE], &self.email);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<[u8; ROW_SIZE]> {
        let mut buffer = [0u8; ROW_SIZE];
        self.serialize_into(&mut buffer)?;
        Ok(buffer)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ROW_SIZE {
            return Err(DatabaseError::SerializationError {
                details: format!("Incomplete row: {} < {} bytes", bytes.len(), ROW_SIZE),
            });
        }

        let id = Key::from_le_bytes([
            bytes[ID_OFFSET],
            bytes[ID_OFFSET + 1],
            bytes[ID_OFFSET + 2],
            bytes[ID_OFFSET + 3],
        ]);
        let username = read_field(
            "username",
            &bytes[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE],
        )?;
        let email = read_field("email", &bytes[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE])?;

        Ok(Row {
            id,
            username,
            email,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn check_field(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(DatabaseError::FieldTooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

// Caller has already checked the value fits.
fn write_field(slot: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    slot[0] = bytes.len() as u8;
    slot[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + bytes.len()].copy_from_slice(bytes);
}

fn read_field(field: &'static str, slot: &[u8]) -> Result<String> {
    let length = slot[0] as usize;
    if length > slot.len() - LENGTH_PREFIX_SIZE {
        return Err(DatabaseError::SerializationError {
            details: format!("Stored {} length {} exceeds its column", field, length),
        });
    }
    String::from_utf8(slot[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + length].to_vec()).map_err(
        |_| DatabaseError::SerializationError {
            details: format!("Invalid UTF-8 in {}", field),
        },
    )
}
