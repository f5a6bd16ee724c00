use std::fmt::Write as _;

use tracing::{debug, info};

use crate::{
    storage::{
        cursor::Cursor,
        node::{
            LEAF_NODE_CELL_SIZE, LEAF_NODE_KEY_SIZE, LEAF_NODE_LEFT_SPLIT_COUNT,
            LEAF_NODE_MAX_CELLS, LEAF_NODE_VALUE_OFFSET,
        },
        pager::Pager,
    },
    types::{
        Key, PageNum,
        error::{DatabaseError, Result},
        page::NodeType,
        row::Row,
    },
};

/// Where a key lives, or would be inserted, inside a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub page_num: PageNum,
    pub cell_num: usize,
}

/// Shape summary produced by `BTree::verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub height: usize,
    pub leaf_pages: usize,
    pub internal_pages: usize,
    pub rows: usize,
}

/// Key-ordered tree over pager pages. Nodes refer to each other by page
/// number only; the tree itself just remembers which page is the root.
pub struct BTree {
    pager: Pager,
    root_page: PageNum,
    internal_max_keys: usize,
}

impl BTree {
    pub fn new(pager: Pager, root_page: PageNum, internal_max_keys: usize) -> Self {
        Self {
            pager,
            root_page,
            internal_max_keys,
        }
    }

    /// Allocates an empty root leaf.
    pub fn create(mut pager: Pager, internal_max_keys: usize) -> Result<Self> {
        let root_page = pager.allocate_page().map_err(table_full)?;
        let root = pager.get_page(root_page)?;
        root.initialize_leaf();
        root.set_root(true);
        debug!(root_page, "created empty tree");
        Ok(Self::new(pager, root_page, internal_max_keys))
    }

    pub fn root_page(&self) -> PageNum {
        self.root_page
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    pub fn into_pager(self) -> Pager {
        self.pager
    }

    /// Descends to the leaf that owns `key` and returns the first cell with a
    /// key `>= key` (the insertion point when `key` is absent).
    pub fn locate(&mut self, key: Key) -> Result<Position> {
        let mut page_num = self.root_page;
        loop {
            let page = self.pager.get_page(page_num)?;
            match page.node_type()? {
                NodeType::Leaf => {
                    return Ok(Position {
                        page_num,
                        cell_num: page.leaf_find(key),
                    });
                }
                NodeType::Internal => {
                    let index = page.internal_find_child(key);
                    page_num = page.internal_child(index)?;
                }
            }
        }
    }

    pub fn find(&mut self, key: Key) -> Result<Cursor<'_>> {
        let position = self.locate(key)?;
        Cursor::new(self, position)
    }

    /// Cursor at the leftmost cell of the leftmost leaf.
    pub fn select_all(&mut self) -> Result<Cursor<'_>> {
        let mut page_num = self.root_page;
        loop {
            let page = self.pager.get_page(page_num)?;
            match page.node_type()? {
                NodeType::Leaf => break,
                NodeType::Internal => page_num = page.internal_child(0)?,
            }
        }
        Cursor::new(
            self,
            Position {
                page_num,
                cell_num: 0,
            },
        )
    }

    pub fn get(&mut self, key: Key) -> Result<Option<Row>> {
        let position = self.locate(key)?;
        let page = self.pager.get_page(position.page_num)?;
        if position.cell_num < page.leaf_num_cells() && page.leaf_key(position.cell_num) == key {
            return Ok(Some(Row::from_bytes(page.leaf_value(position.cell_num))?));
        }
        Ok(None)
    }

    /// Inserts `row` under `key`. Every rejection (`DuplicateKey`,
    /// `TableFull`, codec errors) happens before any node is modified.
    pub fn insert(&mut self, key: Key, row: &Row) -> Result<()> {
        let mut cell = vec![0u8; LEAF_NODE_CELL_SIZE];
        cell[..LEAF_NODE_KEY_SIZE].copy_from_slice(&key.to_le_bytes());
        row.serialize_into(&mut cell[LEAF_NODE_VALUE_OFFSET..])?;

        let position = self.locate(key)?;
        let leaf = self.pager.get_page(position.page_num)?;
        let num_cells = leaf.leaf_num_cells();
        if position.cell_num < num_cells && leaf.leaf_key(position.cell_num) == key {
            return Err(DatabaseError::DuplicateKey { key });
        }

        if num_cells < LEAF_NODE_MAX_CELLS {
            leaf.leaf_insert_at(position.cell_num, &cell);
            return Ok(());
        }

        let needed = self.pages_needed_for_split(position.page_num)?;
        self.pager.ensure_capacity(needed).map_err(table_full)?;
        self.split_leaf_and_insert(position, cell)
    }

    /// Pages a split starting at `leaf_page` will allocate: the new leaf, one
    /// sibling per full ancestor, and a new root if the split reaches it.
    fn pages_needed_for_split(&mut self, leaf_page: PageNum) -> Result<u32> {
        let mut needed = 1;
        let mut page_num = leaf_page;
        loop {
            let page = self.pager.get_page(page_num)?;
            if page.is_root() {
                needed += 1;
                break;
            }
            let parent_num = page.parent();
            let parent = self.pager.get_page(parent_num)?;
            if parent.node_type()? != NodeType::Internal {
                return Err(DatabaseError::CorruptedPage {
                    page_num: parent_num,
                    reason: format!("parent of page {} is not an internal node", page_num),
                });
            }
            if parent.internal_num_keys() < self.internal_max_keys {
                break;
            }
            needed += 1;
            page_num = parent_num;
        }
        Ok(needed)
    }

    fn split_leaf_and_insert(&mut self, position: Position, cell: Vec<u8>) -> Result<()> {
        let old_page = position.page_num;
        let (mut cells, parent, was_root, next_leaf) = {
            let page = self.pager.get_page(old_page)?;
            (
                page.leaf_cells(),
                page.parent(),
                page.is_root(),
                page.leaf_next_leaf(),
            )
        };
        cells.insert(position.cell_num, cell);
        let right_cells = cells.split_off(LEAF_NODE_LEFT_SPLIT_COUNT);
        let separator = cell_key(&cells[cells.len() - 1]);

        let new_page = self.pager.allocate_page().map_err(table_full)?;
        let right = self.pager.get_page(new_page)?;
        right.initialize_leaf();
        right.set_parent(parent);
        right.write_leaf_cells(&right_cells);
        right.set_leaf_next_leaf(next_leaf);

        let left = self.pager.get_page(old_page)?;
        left.write_leaf_cells(&cells);
        left.set_leaf_next_leaf(Some(new_page));

        debug!(left = old_page, right = new_page, separator, "split leaf");
        if was_root {
            self.create_new_root(old_page, new_page, separator)
        } else {
            self.insert_into_parent(parent, old_page, new_page, separator)
        }
    }

    /// `left` keeps its page and now holds keys `<= separator`; `right` is its
    /// new upper sibling and takes over `left`'s old slot in the parent.
    fn insert_into_parent(
        &mut self,
        parent_num: PageNum,
        left: PageNum,
        right: PageNum,
        separator: Key,
    ) -> Result<()> {
        let parent = self.pager.get_page(parent_num)?;
        if parent.node_type()? != NodeType::Internal {
            return Err(DatabaseError::CorruptedPage {
                page_num: parent_num,
                reason: "split propagated into a non-internal node".to_string(),
            });
        }
        let index = parent
            .internal_child_index_of(left)
            .ok_or_else(|| DatabaseError::CorruptedPage {
                page_num: parent_num,
                reason: format!("page {} is not a child of its recorded parent", left),
            })?;
        let (mut children, mut keys) = parent.internal_entries()?;
        children[index] = right;
        children.insert(index, left);
        keys.insert(index, separator);

        self.pager.get_page(right)?.set_parent(parent_num);

        if keys.len() <= self.internal_max_keys {
            self.pager
                .get_page(parent_num)?
                .write_internal_entries(&children, &keys);
            return Ok(());
        }
        self.split_internal(parent_num, children, keys)
    }

    fn split_internal(
        &mut self,
        page_num: PageNum,
        mut children: Vec<PageNum>,
        mut keys: Vec<Key>,
    ) -> Result<()> {
        let mid = keys.len() / 2;
        let promoted = keys[mid];
        let right_keys = keys.split_off(mid + 1);
        let right_children = children.split_off(mid + 1);
        keys.truncate(mid);

        let (parent, was_root) = {
            let page = self.pager.get_page(page_num)?;
            (page.parent(), page.is_root())
        };

        let new_page = self.pager.allocate_page().map_err(table_full)?;
        let right = self.pager.get_page(new_page)?;
        right.initialize_internal();
        right.set_parent(parent);
        right.write_internal_entries(&right_children, &right_keys);

        self.pager
            .get_page(page_num)?
            .write_internal_entries(&children, &keys);
        for child in &right_children {
            self.pager.get_page(*child)?.set_parent(new_page);
        }

        debug!(left = page_num, right = new_page, promoted, "split internal node");
        if was_root {
            self.create_new_root(page_num, new_page, promoted)
        } else {
            self.insert_into_parent(parent, page_num, new_page, promoted)
        }
    }

    fn create_new_root(&mut self, left: PageNum, right: PageNum, separator: Key) -> Result<()> {
        let root_page = self.pager.allocate_page().map_err(table_full)?;
        let root = self.pager.get_page(root_page)?;
        root.initialize_internal();
        root.set_root(true);
        root.write_internal_entries(&[left, right], &[separator]);

        for child in [left, right] {
            let page = self.pager.get_page(child)?;
            page.set_root(false);
            page.set_parent(root_page);
        }

        info!(old_root = self.root_page, new_root = root_page, "root split");
        self.root_page = root_page;
        Ok(())
    }

    /// Walks the whole tree checking key order, separator bounds, parent
    /// pointers, uniform leaf depth and the leaf sibling chain.
    pub fn verify(&mut self) -> Result<TreeStats> {
        let mut stats = TreeStats::default();
        let mut leaves = Vec::new();
        let root = self.root_page;
        if !self.pager.get_page(root)?.is_root() {
            return Err(DatabaseError::CorruptedPage {
                page_num: root,
                reason: "root page is not flagged as root".to_string(),
            });
        }
        self.verify_node(root, None, None, None, 1, &mut stats, &mut leaves)?;

        for pair in leaves.windows(2) {
            let next = self.pager.get_page(pair[0])?.leaf_next_leaf();
            if next != Some(pair[1]) {
                return Err(DatabaseError::CorruptedPage {
                    page_num: pair[0],
                    reason: format!("next leaf is {:?}, expected {}", next, pair[1]),
                });
            }
        }
        if let Some(&last) = leaves.last() {
            if let Some(next) = self.pager.get_page(last)?.leaf_next_leaf() {
                return Err(DatabaseError::CorruptedPage {
                    page_num: last,
                    reason: format!("rightmost leaf links to page {}", next),
                });
            }
        }
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_node(
        &mut self,
        page_num: PageNum,
        parent: Option<PageNum>,
        lower: Option<Key>,
        upper: Option<Key>,
        depth: usize,
        stats: &mut TreeStats,
        leaves: &mut Vec<PageNum>,
    ) -> Result<()> {
        let corrupt = |reason: String| DatabaseError::CorruptedPage { page_num, reason };
        let page = self.pager.get_page(page_num)?;
        if let Some(parent) = parent {
            if page.parent() != parent || page.is_root() {
                return Err(corrupt(format!(
                    "parent pointer {} (root flag {}), expected {}",
                    page.parent(),
                    page.is_root(),
                    parent
                )));
            }
        }
        let in_bounds = |key: Key| lower.is_none_or(|low| key > low) && upper.is_none_or(|high| key <= high);

        match page.node_type()? {
            NodeType::Leaf => {
                let num_cells = page.leaf_num_cells();
                if num_cells == 0 && parent.is_some() {
                    return Err(corrupt("empty non-root leaf".to_string()));
                }
                for cell_num in 0..num_cells {
                    let key = page.leaf_key(cell_num);
                    if cell_num > 0 && page.leaf_key(cell_num - 1) >= key {
                        return Err(corrupt(format!("keys out of order at cell {}", cell_num)));
                    }
                    if !in_bounds(key) {
                        return Err(corrupt(format!("key {} outside ({:?}, {:?}]", key, lower, upper)));
                    }
                }
                if stats.height == 0 {
                    stats.height = depth;
                } else if stats.height != depth {
                    return Err(corrupt(format!("leaf at depth {}, expected {}", depth, stats.height)));
                }
                stats.leaf_pages += 1;
                stats.rows += num_cells;
                leaves.push(page_num);
            }
            NodeType::Internal => {
                let (children, keys) = page.internal_entries()?;
                if keys.is_empty() {
                    return Err(corrupt("internal node without separators".to_string()));
                }
                for (index, key) in keys.iter().enumerate() {
                    if index > 0 && keys[index - 1] >= *key {
                        return Err(corrupt(format!("separators out of order at {}", index)));
                    }
                    if !in_bounds(*key) {
                        return Err(corrupt(format!("separator {} outside ({:?}, {:?}]", key, lower, upper)));
                    }
                }
                stats.internal_pages += 1;
                for (index, child) in children.iter().enumerate() {
                    let child_lower = if index == 0 { lower } else { Some(keys[index - 1]) };
                    let child_upper = if index < keys.len() { Some(keys[index]) } else { upper };
                    self.verify_node(*child, Some(page_num), child_lower, child_upper, depth + 1, stats, leaves)?;
                }
            }
        }
        Ok(())
    }

    /// Indented outline of the tree, one line per node, key and separator.
    pub fn render(&mut self) -> Result<String> {
        let mut out = String::new();
        self.render_node(self.root_page, 0, &mut out)?;
        Ok(out)
    }

    fn render_node(&mut self, page_num: PageNum, level: usize, out: &mut String) -> Result<()> {
        let indent = "  ".repeat(level);
        let page = self.pager.get_page(page_num)?;
        match page.node_type()? {
            NodeType::Leaf => {
                let num_cells = page.leaf_num_cells();
                let _ = writeln!(out, "{}- leaf (size {})", indent, num_cells);
                for cell_num in 0..num_cells {
                    let _ = writeln!(out, "{}  - {}", indent, page.leaf_key(cell_num));
                }
            }
            NodeType::Internal => {
                let (children, keys) = page.internal_entries()?;
                let _ = writeln!(out, "{}- internal (size {})", indent, keys.len());
                for (index, child) in children.iter().enumerate() {
                    self.render_node(*child, level + 1, out)?;
                    if let Some(key) = keys.get(index) {
                        let _ = writeln!(out, "{}  - key {}", indent, key);
                    }
                }
            }
        }
        Ok(())
    }
}

fn cell_key(cell: &[u8]) -> Key {
    Key::from_le_bytes([cell[0], cell[1], cell[2], cell[3]])
}

/// Running out of pages while growing the tree is a full table, not a pager
/// fault.
fn table_full(error: DatabaseError) -> DatabaseError {
    match error {
        DatabaseError::PageOutOfBounds { .. } => DatabaseError::TableFull,
        other => other,
    }
}
