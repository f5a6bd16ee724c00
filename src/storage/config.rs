//! Storage configuration for a table file.

use serde::{Deserialize, Serialize};

use crate::{
    storage::node::INTERNAL_NODE_MAX_CELLS,
    types::{
        TABLE_MAX_PAGES,
        error::{DatabaseError, Result},
    },
};

pub const MAX_PAGES_ENV: &str = "G2DB_MAX_PAGES";
pub const INTERNAL_MAX_KEYS_ENV: &str = "G2DB_INTERNAL_MAX_KEYS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upper bound on pages in the file, header page included. Bounds the
    /// table's row capacity.
    pub max_pages: u32,
    /// Keys an internal node may hold before it splits. Never more than fits
    /// in a page.
    pub internal_max_keys: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_pages: TABLE_MAX_PAGES,
            internal_max_keys: INTERNAL_NODE_MAX_CELLS,
        }
    }
}

impl StorageConfig {
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_internal_max_keys(mut self, internal_max_keys: usize) -> Self {
        self.internal_max_keys = internal_max_keys;
        self
    }

    /// Defaults overlaid with `G2DB_MAX_PAGES` / `G2DB_INTERNAL_MAX_KEYS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same overlay as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(MAX_PAGES_ENV) {
            config.max_pages = parse_var(MAX_PAGES_ENV, &value)?;
        }
        if let Some(value) = lookup(INTERNAL_MAX_KEYS_ENV) {
            config.internal_max_keys = parse_var(INTERNAL_MAX_KEYS_ENV, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // header page + root leaf
        if self.max_pages < 2 {
            return Err(DatabaseError::InvalidConfig {
                reason: format!("max_pages must be at least 2, got {}", self.max_pages),
            });
        }
        if !(2..=INTERNAL_NODE_MAX_CELLS).contains(&self.internal_max_keys) {
            return Err(DatabaseError::InvalidConfig {
                reason: format!(
                    "internal_max_keys must be within 2..={}, got {}",
                    INTERNAL_NODE_MAX_CELLS, self.internal_max_keys
                ),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| DatabaseError::InvalidConfig {
        reason: format!("{} must be an integer, got '{}'", name, value),
    })
}
