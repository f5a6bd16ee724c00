use std::path::PathBuf;

use tempfile::TempDir;

use crate::{
    storage::{config::StorageConfig, table::Table},
    types::error::Result,
};

/// A database file inside a private temporary directory, removed on drop.
pub struct TempDatabase {
    pub path: PathBuf,
    pub config: StorageConfig,
    _dir: TempDir,
}

impl TempDatabase {
    pub fn new() -> Self {
        Self::with_prefix("g2db_test")
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self::with_config(prefix, StorageConfig::default())
    }

    pub fn with_config(prefix: &str, config: StorageConfig) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .unwrap_or_else(|err| panic!("failed to create temp dir for {}: {}", prefix, err));
        let path = dir.path().join(format!("{}.db", prefix));
        Self {
            path,
            config,
            _dir: dir,
        }
    }

    /// Opens (or reopens) the table backed by this file.
    pub fn open(&self) -> Result<Table> {
        Table::open_with_config(&self.path, self.config.clone())
    }
}

impl Default for TempDatabase {
    fn default() -> Self {
        Self::new()
    }
}
