pub mod error;
pub mod page;
pub mod row;

// Common type aliases
pub type PageNum = u32;
pub type Key = u32;

// Page constants
pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: u32 = 100;
pub const HEADER_PAGE_NUM: PageNum = 0;

// Column capacities in bytes
pub const COLUMN_USERNAME_SIZE: usize = 32;
pub const COLUMN_EMAIL_SIZE: usize = 255;
