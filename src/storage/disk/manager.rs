use std::{
    collections::{HashMap, VecDeque},
    fs::OpenOptions,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use hashlink::LinkedHashMap;
use log::debug;
use thiserror::Error;

use crate::{storage::page::page_constants::PAGE_SIZE, utils::fdpool::FdPool};

// Open descriptors kept around at any one time. Evicted ones are
// transparently reopened from their recorded path.
const FD_POOL_ENTRIES: usize = 8;

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("file {0} is not registered with the disk manager")]
    UnknownFile(u64),

    #[error("page {page_no} of file {file_id} has not been allocated")]
    PageNotAllocated { file_id: u64, page_no: u32 },

    #[error("page {page_no} of file {file_id} has been disposed")]
    PageDisposed { file_id: u64, page_no: u32 },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

struct FileMetadata {
    // A mapping from page number to its offset on disk. Disposed pages are
    // marked None and their slot is recycled by a later allocation.
    pages: LinkedHashMap<u32, Option<u64>>,

    // (page_no, offset) pairs of disposed pages, reused first-in first-out.
    free_slots: VecDeque<(u32, u64)>,
}

/// Page-oriented file manager. Files live under `<data_dir>/base/` and are
/// identified by their inode number; every read and write moves exactly one
/// page at a page-aligned offset.
pub struct Manager {
    base_dir: PathBuf,

    // Mapping of inode numbers to file paths, used to reopen descriptors
    // that fell out of the fd pool.
    file_map: HashMap<u64, PathBuf>,
    file_descriptors: FdPool,
    files: HashMap<u64, FileMetadata>,

    num_reads: u64,
    num_writes: u64,
    num_disposes: u64,

    // Monotonically increasing file name counter
    mono_id: u64,
}

impl Manager {
    pub fn new(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let base_dir = data_dir.as_ref().join("base");
        std::fs::create_dir_all(&base_dir)?;

        Ok(Manager {
            base_dir,
            file_map: HashMap::new(),
            file_descriptors: FdPool::new(FD_POOL_ENTRIES),
            files: HashMap::new(),
            num_reads: 0,
            num_writes: 0,
            num_disposes: 0,
            mono_id: 0,
        })
    }

    pub fn create_db_file(&mut self) -> Result<(u64, PathBuf), DiskError> {
        let oid = self.mono_id;
        self.mono_id += 1;

        let path = self.base_dir.join(format!("{oid}.bin"));
        let new_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let (file_id, evicted) = self.file_descriptors.set(new_file)?;
        if let Some(evicted) = evicted {
            debug!("fd pool evicted file {evicted}");
        }

        self.file_map.insert(file_id, path.clone());
        self.files.insert(
            file_id,
            FileMetadata {
                pages: LinkedHashMap::new(),
                free_slots: VecDeque::new(),
            },
        );

        Ok((file_id, path))
    }

    /// Allocates a page in the file and returns its page number, recycling
    /// the slot of a disposed page when one is available. The file is
    /// extended with a zeroed page right away so the new page can be read
    /// back even if it is never written before eviction.
    pub fn allocate_page(&mut self, file_id: u64) -> Result<u32, DiskError> {
        let file_meta = self
            .files
            .get_mut(&file_id)
            .ok_or(DiskError::UnknownFile(file_id))?;

        let page_no = if let Some((page_no, offset)) = file_meta.free_slots.pop_front() {
            file_meta.pages.replace(page_no, Some(offset));
            page_no
        } else {
            let page_no = file_meta.pages.len() as u32;
            let offset = (page_no as usize * PAGE_SIZE) as u64;
            file_meta.pages.insert(page_no, Some(offset));
            page_no
        };

        self.write_page(file_id, page_no, &[0u8; PAGE_SIZE])?;
        Ok(page_no)
    }

    pub fn write_page(
        &mut self,
        file_id: u64,
        page_no: u32,
        page_data: &[u8],
    ) -> Result<(), DiskError> {
        debug_assert_eq!(page_data.len(), PAGE_SIZE, "writes move whole pages");

        let offset = self.page_offset(file_id, page_no)?;

        let mut db_io = self.db_io(file_id)?;
        db_io.seek(SeekFrom::Start(offset))?;
        db_io.write_all(page_data)?;
        db_io.flush()?;

        self.num_writes += 1;
        Ok(())
    }

    pub fn read_page(
        &mut self,
        file_id: u64,
        page_no: u32,
        page_data: &mut [u8],
    ) -> Result<(), DiskError> {
        debug_assert_eq!(page_data.len(), PAGE_SIZE, "reads move whole pages");

        let offset = self.page_offset(file_id, page_no)?;

        let mut db_io = self.db_io(file_id)?;
        db_io.seek(SeekFrom::Start(offset))?;
        db_io.read_exact(page_data)?;

        self.num_reads += 1;
        Ok(())
    }

    /// Releases the page on stable storage. Its number and offset go on the
    /// free-slot list for reuse by a later allocation.
    pub fn dispose_page(&mut self, file_id: u64, page_no: u32) -> Result<(), DiskError> {
        let file_meta = self
            .files
            .get_mut(&file_id)
            .ok_or(DiskError::UnknownFile(file_id))?;

        match file_meta.pages.get(&page_no).copied() {
            Some(Some(offset)) => {
                file_meta.pages.replace(page_no, None);
                file_meta.free_slots.push_back((page_no, offset));
                self.num_disposes += 1;
                Ok(())
            }
            Some(None) => Err(DiskError::PageDisposed { file_id, page_no }),
            None => Err(DiskError::PageNotAllocated { file_id, page_no }),
        }
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }

    pub fn num_disposes(&self) -> u64 {
        self.num_disposes
    }

    fn page_offset(&self, file_id: u64, page_no: u32) -> Result<u64, DiskError> {
        let file_meta = self
            .files
            .get(&file_id)
            .ok_or(DiskError::UnknownFile(file_id))?;

        match file_meta.pages.get(&page_no).copied() {
            Some(Some(offset)) => Ok(offset),
            Some(None) => Err(DiskError::PageDisposed { file_id, page_no }),
            None => Err(DiskError::PageNotAllocated { file_id, page_no }),
        }
    }

    fn db_io(&mut self, file_id: u64) -> Result<&std::fs::File, DiskError> {
        if self.file_descriptors.get(file_id).is_none() {
            // Descriptor fell out of the pool, reopen from the recorded path
            let path = self
                .file_map
                .get(&file_id)
                .ok_or(DiskError::UnknownFile(file_id))?;

            debug!("reopening file {file_id} at {}", path.display());

            let file = OpenOptions::new().read(true).write(true).open(path)?;
            let (_, evicted) = self.file_descriptors.set(file)?;
            if let Some(evicted) = evicted {
                debug!("fd pool evicted file {evicted}");
            }
        }

        self.file_descriptors
            .get(file_id)
            .ok_or(DiskError::UnknownFile(file_id))
    }
}
