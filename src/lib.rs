pub mod interpreter;
pub mod storage;
pub mod types;
pub mod utils;
