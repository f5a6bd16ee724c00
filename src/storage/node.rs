/*
 * Node Layout (B-tree view over a Page)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │ COMMON HEADER (6 bytes)                                         │
 * │  node_type(1) | is_root(1) | parent(4)                          │
 * ├─────────────────────────────────────────────────────────────────┤
 * │ LEAF:     num_cells(4) | next_leaf(4)                           │
 * │           [key(4) | row(ROW_SIZE)] * num_cells                  │
 * │ INTERNAL: num_keys(4)  | right_child(4)                         │
 * │           [child(4) | key(4)] * num_keys                        │
 * └─────────────────────────────────────────────────────────────────┘
 *
 * Page references are page numbers. Page 0 is the file header, so 0 never
 * names a node and doubles as "no page" for next_leaf.
 */

use crate::types::{
    Key, PAGE_SIZE, PageNum,
    error::{DatabaseError, Result},
    page::{NodeType, Page},
    row::ROW_SIZE,
};

pub const NO_PAGE: PageNum = 0;

// Common node header
pub const NODE_TYPE_SIZE: usize = 1;
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = 1;
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = 4;
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
pub const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf node body
pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal node body
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_MAX_CELLS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

fn leaf_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

fn internal_cell_offset(index: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + index * INTERNAL_NODE_CELL_SIZE
}

impl Page {
    /// Reads the node tag and checks the stored count fits the page.
    pub fn node_type(&self) -> Result<NodeType> {
        let node_type = NodeType::from_u8(self.read_u8(NODE_TYPE_OFFSET))?;
        let (count, max) = match node_type {
            NodeType::Leaf => (self.leaf_num_cells(), LEAF_NODE_MAX_CELLS),
            NodeType::Internal => (self.internal_num_keys(), INTERNAL_NODE_MAX_CELLS),
        };
        if count > max {
            return Err(DatabaseError::CorruptedPage {
                page_num: self.page_num,
                reason: format!("{:?} node claims {} cells (max {})", node_type, count, max),
            });
        }
        Ok(node_type)
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.write_u8(NODE_TYPE_OFFSET, node_type.as_u8());
    }

    pub fn is_root(&self) -> bool {
        self.read_u8(IS_ROOT_OFFSET) != 0
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.write_u8(IS_ROOT_OFFSET, is_root as u8);
    }

    pub fn parent(&self) -> PageNum {
        self.read_u32(PARENT_POINTER_OFFSET)
    }

    pub fn set_parent(&mut self, parent: PageNum) {
        self.write_u32(PARENT_POINTER_OFFSET, parent);
    }

    pub fn initialize_leaf(&mut self) {
        self.as_bytes_mut().fill(0);
        self.set_node_type(NodeType::Leaf);
        self.set_root(false);
        self.set_leaf_num_cells(0);
        self.set_leaf_next_leaf(None);
    }

    pub fn initialize_internal(&mut self) {
        self.as_bytes_mut().fill(0);
        self.set_node_type(NodeType::Internal);
        self.set_root(false);
        self.set_internal_num_keys(0);
        self.set_internal_right_child(NO_PAGE);
    }

    pub fn leaf_num_cells(&self) -> usize {
        self.read_u32(LEAF_NODE_NUM_CELLS_OFFSET) as usize
    }

    pub fn set_leaf_num_cells(&mut self, num_cells: usize) {
        self.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, num_cells as u32);
    }

    pub fn leaf_next_leaf(&self) -> Option<PageNum> {
        match self.read_u32(LEAF_NODE_NEXT_LEAF_OFFSET) {
            NO_PAGE => None,
            page_num => Some(page_num),
        }
    }

    pub fn set_leaf_next_leaf(&mut self, next_leaf: Option<PageNum>) {
        self.write_u32(LEAF_NODE_NEXT_LEAF_OFFSET, next_leaf.unwrap_or(NO_PAGE));
    }

    pub fn leaf_key(&self, cell_num: usize) -> Key {
        self.read_u32(leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET)
    }

    pub fn leaf_value(&self, cell_num: usize) -> &[u8] {
        self.slice(
            leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET,
            LEAF_NODE_VALUE_SIZE,
        )
    }

    pub fn leaf_cell(&self, cell_num: usize) -> &[u8] {
        self.slice(leaf_cell_offset(cell_num), LEAF_NODE_CELL_SIZE)
    }

    pub fn write_leaf_cell(&mut self, cell_num: usize, cell: &[u8]) {
        debug_assert_eq!(cell.len(), LEAF_NODE_CELL_SIZE);
        self.write_slice(leaf_cell_offset(cell_num), cell);
    }

    pub fn leaf_max_key(&self) -> Option<Key> {
        match self.leaf_num_cells() {
            0 => None,
            n => Some(self.leaf_key(n - 1)),
        }
    }

    /// Index of the first cell whose key is `>= key`; `num_cells` if none.
    pub fn leaf_find(&self, key: Key) -> usize {
        let mut low = 0;
        let mut high = self.leaf_num_cells();
        while low < high {
            let mid = low + (high - low) / 2;
            if self.leaf_key(mid) < key {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    /// Shifts cells at and after `cell_num` one slot right and writes the new
    /// cell in the gap. The caller guarantees there is room.
    pub fn leaf_insert_at(&mut self, cell_num: usize, cell: &[u8]) {
        let num_cells = self.leaf_num_cells();
        debug_assert!(num_cells < LEAF_NODE_MAX_CELLS);
        if cell_num < num_cells {
            let start = leaf_cell_offset(cell_num);
            let end = leaf_cell_offset(num_cells);
            self.as_bytes_mut()
                .copy_within(start..end, start + LEAF_NODE_CELL_SIZE);
        }
        self.write_leaf_cell(cell_num, cell);
        self.set_leaf_num_cells(num_cells + 1);
    }

    pub fn leaf_cells(&self) -> Vec<Vec<u8>> {
        (0..self.leaf_num_cells())
            .map(|cell_num| self.leaf_cell(cell_num).to_vec())
            .collect()
    }

    /// Replaces all cells; the header other than the count is left alone.
    pub fn write_leaf_cells(&mut self, cells: &[Vec<u8>]) {
        for (cell_num, cell) in cells.iter().enumerate() {
            self.write_leaf_cell(cell_num, cell);
        }
        let tail = leaf_cell_offset(cells.len());
        self.as_bytes_mut()[tail..].fill(0);
        self.set_leaf_num_cells(cells.len());
    }

    pub fn internal_num_keys(&self) -> usize {
        self.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET) as usize
    }

    pub fn set_internal_num_keys(&mut self, num_keys: usize) {
        self.write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys as u32);
    }

    pub fn internal_right_child(&self) -> PageNum {
        self.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    pub fn set_internal_right_child(&mut self, child: PageNum) {
        self.write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, child);
    }

    /// Child `index`, where `index == num_keys` names the right child.
    pub fn internal_child(&self, index: usize) -> Result<PageNum> {
        let num_keys = self.internal_num_keys();
        let child = match index {
            i if i < num_keys => self.read_u32(internal_cell_offset(i)),
            i if i == num_keys => self.internal_right_child(),
            _ => {
                return Err(DatabaseError::CorruptedPage {
                    page_num: self.page_num,
                    reason: format!("child index {} past {} keys", index, num_keys),
                });
            }
        };
        if child == NO_PAGE {
            return Err(DatabaseError::CorruptedPage {
                page_num: self.page_num,
                reason: format!("child {} points at the header page", index),
            });
        }
        Ok(child)
    }

    pub fn internal_key(&self, index: usize) -> Key {
        self.read_u32(internal_cell_offset(index) + INTERNAL_NODE_CHILD_SIZE)
    }

    /// Index of the child whose range covers `key`: the first separator
    /// `>= key`, else the right child.
    pub fn internal_find_child(&self, key: Key) -> usize {
        let mut low = 0;
        let mut high = self.internal_num_keys();
        while low < high {
            let mid = low + (high - low) / 2;
            if self.internal_key(mid) < key {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    pub fn internal_child_index_of(&self, child: PageNum) -> Option<usize> {
        let num_keys = self.internal_num_keys();
        if self.internal_right_child() == child {
            return Some(num_keys);
        }
        (0..num_keys).find(|&i| self.read_u32(internal_cell_offset(i)) == child)
    }

    /// All children (right child last) and separators.
    pub fn internal_entries(&self) -> Result<(Vec<PageNum>, Vec<Key>)> {
        let num_keys = self.internal_num_keys();
        let children = (0..=num_keys)
            .map(|index| self.internal_child(index))
            .collect::<Result<Vec<_>>>()?;
        let keys = (0..num_keys).map(|index| self.internal_key(index)).collect();
        Ok((children, keys))
    }

    pub fn write_internal_entries(&mut self, children: &[PageNum], keys: &[Key]) {
        debug_assert_eq!(children.len(), keys.len() + 1);
        debug_assert!(keys.len() <= INTERNAL_NODE_MAX_CELLS);
        for (index, key) in keys.iter().enumerate() {
            let offset = internal_cell_offset(index);
            self.write_u32(offset, children[index]);
            self.write_u32(offset + INTERNAL_NODE_CHILD_SIZE, *key);
        }
        let tail = internal_cell_offset(keys.len());
        self.as_bytes_mut()[tail..].fill(0);
        self.set_internal_num_keys(keys.len());
        self.set_internal_right_child(children[keys.len()]);
    }
}
