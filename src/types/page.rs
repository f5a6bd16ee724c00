use serde::{Deserialize, Serialize};

use crate::types::{
    PAGE_SIZE, PageNum,
    error::{DatabaseError, Result},
};

/// Tag stored in the first byte of every B-tree page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Internal = 5,
    Leaf = 13,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            5 => Ok(NodeType::Internal),
            13 => Ok(NodeType::Leaf),
            _ => Err(DatabaseError::InvalidNodeType(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            NodeType::Internal => 5,
            NodeType::Leaf => 13,
        }
    }
}

/// A fixed-size buffer owned by the pager. All mutation happens in place;
/// the B-tree layer interprets the bytes (see `storage::node`).
#[derive(Debug, Clone)]
pub struct Page {
    pub page_num: PageNum,
    pub is_dirty: bool,
    data: Vec<u8>,
}

impl Page {
    pub fn new(page_num: PageNum) -> Self {
        Self {
            page_num,
            is_dirty: false,
            data: vec![0; PAGE_SIZE],
        }
    }

    pub fn from_bytes(page_num: PageNum, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::CorruptedPage {
                page_num,
                reason: format!("expected {} bytes, got {}", PAGE_SIZE, bytes.len()),
            });
        }
        Ok(Self {
            page_num,
            is_dirty: false,
            data: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the raw buffer. Marks the page dirty.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        &mut self.data
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.as_bytes_mut()[offset] = value;
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.as_bytes_mut()[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    pub fn write_slice(&mut self, offset: usize, bytes: &[u8]) {
        self.as_bytes_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}
