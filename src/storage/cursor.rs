use crate::{
    storage::btree::{BTree, Position},
    types::{
        Key, PageNum,
        error::{DatabaseError, Result},
        page::NodeType,
        row::Row,
    },
};

/// Ordered position over leaf cells. Borrows the tree mutably, so no insert
/// can run while a cursor is alive.
pub struct Cursor<'a> {
    tree: &'a mut BTree,
    page_num: PageNum,
    cell_num: usize,
    end_of_table: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tree: &'a mut BTree, position: Position) -> Result<Self> {
        let mut cursor = Self {
            tree,
            page_num: position.page_num,
            cell_num: position.cell_num,
            end_of_table: false,
        };
        cursor.settle()?;
        Ok(cursor)
    }

    pub fn page_num(&self) -> PageNum {
        self.page_num
    }

    pub fn cell_num(&self) -> usize {
        self.cell_num
    }

    pub fn at_end(&self) -> bool {
        self.end_of_table
    }

    pub fn key(&mut self) -> Result<Key> {
        if self.end_of_table {
            return Err(DatabaseError::CursorExhausted);
        }
        Ok(self.tree.pager_mut().get_page(self.page_num)?.leaf_key(self.cell_num))
    }

    pub fn current(&mut self) -> Result<Row> {
        if self.end_of_table {
            return Err(DatabaseError::CursorExhausted);
        }
        let page = self.tree.pager_mut().get_page(self.page_num)?;
        Row::from_bytes(page.leaf_value(self.cell_num))
    }

    pub fn advance(&mut self) -> Result<()> {
        if self.end_of_table {
            return Ok(());
        }
        self.cell_num += 1;
        self.settle()
    }

    pub fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.next() {
                Some(row) => rows.push(row?),
                None => break,
            }
        }
        Ok(rows)
    }

    // Moves past exhausted leaves along the sibling chain.
    fn settle(&mut self) -> Result<()> {
        loop {
            let page = self.tree.pager_mut().get_page(self.page_num)?;
            if page.node_type()? != NodeType::Leaf {
                return Err(DatabaseError::CorruptedPage {
                    page_num: self.page_num,
                    reason: "cursor positioned on a non-leaf page".to_string(),
                });
            }
            if self.cell_num < page.leaf_num_cells() {
                return Ok(());
            }
            match page.leaf_next_leaf() {
                Some(next) => {
                    self.page_num = next;
                    self.cell_num = 0;
                }
                None => {
                    self.end_of_table = true;
                    return Ok(());
                }
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end_of_table {
            return None;
        }
        let row = self.current().and_then(|row| self.advance().map(|_| row));
        if row.is_err() {
            self.end_of_table = true;
        }
        Some(row)
    }
}
