pub mod btree;
pub mod config;
pub mod cursor;
pub mod header;
pub mod node;
pub mod pager;
pub mod table;

const G2DB_MAGIC: &[u8; 16] = b"G2DB format 1\0\0\0";
const G2DB_FORMAT_VERSION: u32 = 1;
