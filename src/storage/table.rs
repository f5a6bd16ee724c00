use std::path::Path;

use tracing::{info, warn};

use crate::{
    storage::{
        btree::{BTree, TreeStats},
        config::StorageConfig,
        cursor::Cursor,
        header::FileHeader,
        pager::Pager,
    },
    types::{
        HEADER_PAGE_NUM, Key, PageNum,
        error::{DatabaseError, Result},
        page::NodeType,
        row::Row,
    },
};

/// The single table of a database file: header page plus one B-tree keyed
/// by row id.
pub struct Table {
    tree: BTree,
    header: FileHeader,
    config: StorageConfig,
}

impl Table {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StorageConfig) -> Result<Self> {
        config.validate()?;
        let pager = Pager::open(path, config.max_pages)?;
        if pager.num_pages() == 0 {
            Self::create_new(pager, config)
        } else {
            Self::open_existing(pager, config)
        }
    }

    fn create_new(mut pager: Pager, config: StorageConfig) -> Result<Self> {
        let header_page = pager.allocate_page()?;
        debug_assert_eq!(header_page, HEADER_PAGE_NUM);
        let mut tree = BTree::create(pager, config.internal_max_keys)?;
        let header = FileHeader::new(tree.root_page(), tree.pager().num_pages());
        header.write_to(tree.pager_mut().get_page(HEADER_PAGE_NUM)?)?;
        info!(path = %tree.pager().path().display(), "created new database");
        Ok(Self {
            tree,
            header,
            config,
        })
    }

    fn open_existing(mut pager: Pager, config: StorageConfig) -> Result<Self> {
        let file_pages = pager.num_pages();
        if file_pages < 2 {
            return Err(DatabaseError::CorruptFile {
                reason: format!("file holds {} page(s); a header and a root are required", file_pages),
            });
        }

        let header = FileHeader::read_from(pager.get_page(HEADER_PAGE_NUM)?)?;
        if header.root_page == HEADER_PAGE_NUM || header.root_page >= file_pages {
            return Err(DatabaseError::CorruptFile {
                reason: format!("root page {} outside 1..{}", header.root_page, file_pages),
            });
        }
        if header.page_count > file_pages {
            return Err(DatabaseError::CorruptFile {
                reason: format!(
                    "header records {} pages but the file holds {}",
                    header.page_count, file_pages
                ),
            });
        }
        if header.page_count < file_pages {
            warn!(
                recorded = header.page_count,
                actual = file_pages,
                "file has pages past the recorded page count"
            );
        }

        let root = pager.get_page(header.root_page)?;
        let root_is_node = root.node_type().is_ok() && root.is_root();
        if !root_is_node {
            return Err(DatabaseError::CorruptFile {
                reason: format!("page {} is not a valid root node", header.root_page),
            });
        }

        info!(
            path = %pager.path().display(),
            root_page = header.root_page,
            rows = header.row_count,
            "opened existing database"
        );
        let tree = BTree::new(pager, header.root_page, config.internal_max_keys);
        Ok(Self {
            tree,
            header,
            config,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn root_page(&self) -> PageNum {
        self.tree.root_page()
    }

    pub fn len(&self) -> u64 {
        self.header.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.header.row_count == 0
    }

    pub fn pager(&self) -> &Pager {
        self.tree.pager()
    }

    /// Validates interpreter input and stores it as a row keyed by `id`.
    pub fn insert(&mut self, id: i64, username: &str, email: &str) -> Result<()> {
        let row = Row::try_new(id, username, email)?;
        self.insert_row(row)
    }

    pub fn insert_row(&mut self, row: Row) -> Result<()> {
        if row.id == 0 {
            return Err(DatabaseError::NegativeId { id: 0 });
        }
        row.validate()?;
        self.tree.insert(row.id, &row)?;
        self.header.row_count += 1;
        Ok(())
    }

    /// Cursor over every row in ascending id order.
    pub fn select(&mut self) -> Result<Cursor<'_>> {
        self.tree.select_all()
    }

    pub fn rows(&mut self) -> Result<Vec<Row>> {
        self.select()?.collect()
    }

    pub fn get(&mut self, id: i64) -> Result<Option<Row>> {
        match Key::try_from(id) {
            Ok(key) if key > 0 => self.tree.get(key),
            _ => Ok(None),
        }
    }

    pub fn verify(&mut self) -> Result<TreeStats> {
        let stats = self.tree.verify()?;
        if stats.rows as u64 != self.header.row_count {
            warn!(
                counted = stats.rows,
                recorded = self.header.row_count,
                "row count in header disagrees with the tree"
            );
        }
        Ok(stats)
    }

    pub fn render_tree(&mut self) -> Result<String> {
        self.tree.render()
    }

    pub fn root_node_type(&mut self) -> Result<NodeType> {
        let root = self.tree.root_page();
        self.tree.pager_mut().get_page(root)?.node_type()
    }

    /// Records the current root in the header page and flushes everything,
    /// header last.
    pub fn close(mut self) -> Result<()> {
        self.header.root_page = self.tree.root_page();
        self.header.page_count = self.tree.pager().num_pages();
        self.header.change_counter = self.header.change_counter.wrapping_add(1);
        self.header
            .write_to(self.tree.pager_mut().get_page(HEADER_PAGE_NUM)?)?;
        info!(
            root_page = self.header.root_page,
            pages = self.header.page_count,
            rows = self.header.row_count,
            "closing database"
        );
        self.tree.into_pager().close()
    }
}
