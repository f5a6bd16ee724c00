use std::{
    collections::{HashMap, hash_map::Entry},
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::types::{
    HEADER_PAGE_NUM, PAGE_SIZE, PageNum,
    error::{DatabaseError, Result},
    page::Page,
};

/// Maps page numbers onto `PAGE_SIZE` slices of the backing file and keeps
/// every page it has touched resident until `close`.
pub struct Pager {
    path: PathBuf,
    file: File,
    file_length: u64,
    num_pages: u32,
    max_pages: u32,
    page_cache: HashMap<PageNum, Page>,
}

impl Pager {
    pub fn open<P: AsRef<Path>>(path: P, max_pages: u32) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_length = file.metadata()?.len();

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(DatabaseError::CorruptFile {
                reason: format!(
                    "file length {} is not a whole number of {}-byte pages",
                    file_length, PAGE_SIZE
                ),
            });
        }
        let file_pages = file_length / PAGE_SIZE as u64;
        if file_pages > max_pages as u64 {
            return Err(DatabaseError::CorruptFile {
                reason: format!(
                    "file holds {} pages, more than the configured maximum of {}",
                    file_pages, max_pages
                ),
            });
        }

        info!(path = %path.display(), pages = file_pages, "opened pager");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            file_length,
            num_pages: file_pages as u32,
            max_pages,
            page_cache: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    pub fn cached_pages(&self) -> usize {
        self.page_cache.len()
    }

    pub fn is_cached(&self, page_num: PageNum) -> bool {
        self.page_cache.contains_key(&page_num)
    }

    /// Returns the resident page, loading it from the file on first access.
    /// Pages past the end of the file come back zero-filled.
    pub fn get_page(&mut self, page_num: PageNum) -> Result<&mut Page> {
        if page_num >= self.max_pages {
            return Err(DatabaseError::PageOutOfBounds {
                page_num,
                max_pages: self.max_pages,
            });
        }
        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }

        match self.page_cache.entry(page_num) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let page = Self::load_page(&mut self.file, self.file_length, page_num)?;
                Ok(entry.insert(page))
            }
        }
    }

    fn load_page(file: &mut File, file_length: u64, page_num: PageNum) -> Result<Page> {
        let offset = page_offset(page_num);
        if offset + PAGE_SIZE as u64 > file_length {
            debug!(page_num, "materialising page beyond end of file");
            return Ok(Page::new(page_num));
        }
        let mut buffer = vec![0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
        debug!(page_num, "loaded page from disk");
        Page::from_bytes(page_num, &buffer)
    }

    /// Hands out the next unused page number. The page is resident and dirty
    /// on return, so it reaches the file even if the caller never writes it.
    pub fn allocate_page(&mut self) -> Result<PageNum> {
        self.ensure_capacity(1)?;
        let page_num = self.num_pages;
        self.num_pages += 1;
        let mut page = Page::new(page_num);
        page.is_dirty = true;
        self.page_cache.insert(page_num, page);
        debug!(page_num, "allocated page");
        Ok(page_num)
    }

    /// Fails with `PageOutOfBounds` unless `additional` more pages can be
    /// allocated.
    pub fn ensure_capacity(&self, additional: u32) -> Result<()> {
        let required = self.num_pages as u64 + additional as u64;
        if required > self.max_pages as u64 {
            return Err(DatabaseError::PageOutOfBounds {
                page_num: (required - 1).min(u32::MAX as u64) as PageNum,
                max_pages: self.max_pages,
            });
        }
        Ok(())
    }

    pub fn flush(&mut self, page_num: PageNum) -> Result<()> {
        let Some(page) = self.page_cache.get_mut(&page_num) else {
            return Ok(());
        };
        if !page.is_dirty {
            return Ok(());
        }
        let offset = page_offset(page_num);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_bytes())?;
        page.is_dirty = false;
        self.file_length = self.file_length.max(offset + PAGE_SIZE as u64);
        debug!(page_num, "flushed page");
        Ok(())
    }

    /// Writes every dirty page in ascending order, the header page last.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut page_nums: Vec<PageNum> = self
            .page_cache
            .keys()
            .copied()
            .filter(|&page_num| page_num != HEADER_PAGE_NUM)
            .collect();
        page_nums.sort_unstable();
        for page_num in page_nums {
            self.flush(page_num)?;
        }
        self.flush(HEADER_PAGE_NUM)?;
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.flush_all()?;
        info!(path = %self.path.display(), pages = self.num_pages, "closed pager");
        Ok(())
    }
}

fn page_offset(page_num: PageNum) -> u64 {
    page_num as u64 * PAGE_SIZE as u64
}
