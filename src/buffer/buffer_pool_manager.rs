use log::{debug, error};
use thiserror::Error;

use crate::{
    buffer::{
        clock::ClockAllocator,
        page_table::{PageIdentity, PageTable, PageTableError},
    },
    storage::{
        disk::manager::{DiskError, Manager},
        page::Page,
    },
};

pub type FrameId = u32;
pub type PageId = u32;
pub type FileId = u64;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("all {0} buffer frames are pinned")]
    PoolExhausted(usize),

    #[error("disk i/o failed: {0}")]
    Disk(#[from] DiskError),

    #[error("page table failure: {0}")]
    PageTable(#[from] PageTableError),

    #[error("page {page_no} of file {file_id} is not in the buffer pool")]
    PageNotFound { file_id: FileId, page_no: PageId },

    #[error("page {page_no} of file {file_id} is not pinned")]
    PageNotPinned { file_id: FileId, page_no: PageId },

    #[error("page {page_no} of file {file_id} is still pinned")]
    PagePinned { file_id: FileId, page_no: PageId },

    #[error("frame {0} metadata is inconsistent with the page table")]
    Corrupted(FrameId),
}

/// Per-frame metadata, kept in an array parallel to the frame pool.
pub struct FrameHeader {
    pub owner: Option<PageIdentity>,
    pub valid: bool,
    pub dirty: bool,
    pub refbit: bool,
    pub pin_count: u32,
}

impl FrameHeader {
    fn new() -> Self {
        FrameHeader {
            owner: None,
            valid: false,
            dirty: false,
            refbit: false,
            pin_count: 0,
        }
    }

    // Fresh-fetch state: the caller that brought the page in holds the
    // first pin, and the frame starts with one trip around the clock.
    fn set(&mut self, owner: PageIdentity) {
        self.owner = Some(owner);
        self.valid = true;
        self.dirty = false;
        self.refbit = true;
        self.pin_count = 1;
    }

    pub(crate) fn clear(&mut self) {
        *self = FrameHeader::new();
    }
}

/// Caches fixed-size pages from disk files in a bounded pool of frames.
///
/// Frames and their headers are two parallel arenas allocated once at
/// construction; frames never relocate, and callers reach page bytes only
/// through borrows of this manager, bounded by their pin.
///
/// All operations are synchronous and assume a single logical thread of
/// control; callers sharing a manager across threads must serialize whole
/// operations externally.
pub struct BufferPoolManager {
    num_frames: usize,
    pool: Vec<Page>,
    frame_table: Vec<FrameHeader>,
    page_table: PageTable,
    clock: ClockAllocator,
    disk: Manager,
}

impl BufferPoolManager {
    pub fn new(num_frames: usize, disk: Manager) -> Self {
        assert!(num_frames > 0, "buffer pool needs at least one frame");

        BufferPoolManager {
            num_frames,
            pool: (0..num_frames).map(|_| Page::new()).collect(),
            frame_table: (0..num_frames).map(|_| FrameHeader::new()).collect(),
            page_table: PageTable::new(),
            clock: ClockAllocator::new(num_frames),
            disk,
        }
    }

    /// Creates a new page-oriented file on disk and returns its id.
    pub fn create_file(&mut self) -> Result<FileId, BufferError> {
        let (file_id, _) = self.disk.create_db_file()?;
        Ok(file_id)
    }

    /// Pins the page and returns the frame holding it. The frame's contents
    /// are reachable through [`page`](Self::page)/[`page_mut`](Self::page_mut)
    /// until the matching unpin.
    pub fn fetch_page(&mut self, file_id: FileId, page_no: PageId) -> Result<FrameId, BufferError> {
        let identity = PageIdentity { file_id, page_no };

        // Case 1: the page is resident, adjust pin and recency state
        if let Some(frame_id) = self.page_table.lookup(identity) {
            let header = &mut self.frame_table[frame_id as usize];
            header.refbit = true;
            header.pin_count += 1;
            return Ok(frame_id);
        }

        // Case 2: bring it in from disk. A failed read leaves the frame
        // invalid and unregistered; the header is only set once both the
        // read and the page table insert went through.
        let frame_id = self.clock.allocate(
            &mut self.frame_table,
            &mut self.pool,
            &mut self.page_table,
            &mut self.disk,
        )?;

        self.disk
            .read_page(file_id, page_no, self.pool[frame_id as usize].as_bytes_mut())?;

        self.page_table.insert(identity, frame_id)?;
        self.frame_table[frame_id as usize].set(identity);

        Ok(frame_id)
    }

    /// Releases one pin on the page, recording whether the holder modified
    /// its contents. The dirty mark is monotonic: only a successful
    /// write-back clears it.
    pub fn unpin_page(
        &mut self,
        file_id: FileId,
        page_no: PageId,
        mark_dirty: bool,
    ) -> Result<(), BufferError> {
        let identity = PageIdentity { file_id, page_no };

        let frame_id = self
            .page_table
            .lookup(identity)
            .ok_or(BufferError::PageNotFound { file_id, page_no })?;

        let header = &mut self.frame_table[frame_id as usize];
        if header.pin_count == 0 {
            return Err(BufferError::PageNotPinned { file_id, page_no });
        }

        header.pin_count -= 1;
        if mark_dirty {
            header.dirty = true;
        }

        Ok(())
    }

    /// Allocates a fresh page in the file and pins it in a zeroed frame.
    /// No read happens, the page has no prior content.
    pub fn new_page(&mut self, file_id: FileId) -> Result<(PageId, FrameId), BufferError> {
        let page_no = self.disk.allocate_page(file_id)?;

        let frame_id = self.clock.allocate(
            &mut self.frame_table,
            &mut self.pool,
            &mut self.page_table,
            &mut self.disk,
        )?;

        let identity = PageIdentity { file_id, page_no };

        self.pool[frame_id as usize].data.fill(0);
        self.page_table.insert(identity, frame_id)?;
        self.frame_table[frame_id as usize].set(identity);

        Ok((page_no, frame_id))
    }

    /// Destroys the page. A resident copy is discarded without write-back
    /// regardless of pin or dirty state, then the page is released on disk.
    /// Disposing a page that is not resident only runs the disk-level
    /// disposal.
    pub fn dispose_page(&mut self, file_id: FileId, page_no: PageId) -> Result<(), BufferError> {
        let identity = PageIdentity { file_id, page_no };

        if let Some(frame_id) = self.page_table.lookup(identity) {
            self.frame_table[frame_id as usize].clear();
            self.page_table.remove(identity)?;
        }

        self.disk.dispose_page(file_id, page_no)?;
        Ok(())
    }

    /// Writes back and invalidates every resident page of the file.
    ///
    /// All-or-nothing with respect to pins: the whole pool is checked first,
    /// and if any page of the file is still pinned nothing is written or
    /// invalidated, so the caller can retry once all pins are released.
    pub fn flush_file(&mut self, file_id: FileId) -> Result<(), BufferError> {
        for (frame_id, header) in self.frame_table.iter().enumerate() {
            let owner = match header.owner {
                Some(owner) if owner.file_id == file_id => owner,
                _ => continue,
            };

            if header.valid && header.pin_count > 0 {
                return Err(BufferError::PagePinned {
                    file_id,
                    page_no: owner.page_no,
                });
            }

            // An invalid frame still claiming a page of this file means the
            // header and page table have diverged
            if !header.valid {
                return Err(BufferError::Corrupted(frame_id as FrameId));
            }
        }

        for frame_id in 0..self.num_frames {
            let (owner, dirty) = {
                let header = &self.frame_table[frame_id];
                match header.owner {
                    Some(owner) if header.valid && owner.file_id == file_id => {
                        (owner, header.dirty)
                    }
                    _ => continue,
                }
            };

            if dirty {
                self.disk
                    .write_page(owner.file_id, owner.page_no, self.pool[frame_id].as_bytes())?;
                self.frame_table[frame_id].dirty = false;
            }

            self.page_table.remove(owner)?;
            self.frame_table[frame_id].clear();
        }

        Ok(())
    }

    /// Writes every dirty resident page back to disk. Frames stay valid and
    /// registered; only their dirty bits are cleared. The `Drop` impl runs
    /// the same pass, but this is the path on which failures surface.
    pub fn shutdown(&mut self) -> Result<(), BufferError> {
        for frame_id in 0..self.num_frames {
            let owner = {
                let header = &self.frame_table[frame_id];
                if !(header.valid && header.dirty) {
                    continue;
                }
                match header.owner {
                    Some(owner) => owner,
                    None => return Err(BufferError::Corrupted(frame_id as FrameId)),
                }
            };

            self.disk
                .write_page(owner.file_id, owner.page_no, self.pool[frame_id].as_bytes())?;
            self.frame_table[frame_id].dirty = false;
        }

        Ok(())
    }

    pub fn page(&self, frame_id: FrameId) -> &Page {
        &self.pool[frame_id as usize]
    }

    pub fn page_mut(&mut self, frame_id: FrameId) -> &mut Page {
        &mut self.pool[frame_id as usize]
    }

    pub fn pin_count(&self, file_id: FileId, page_no: PageId) -> Option<u32> {
        let frame_id = self.page_table.lookup(PageIdentity { file_id, page_no })?;
        Some(self.frame_table[frame_id as usize].pin_count)
    }

    pub fn is_dirty(&self, file_id: FileId, page_no: PageId) -> Option<bool> {
        let frame_id = self.page_table.lookup(PageIdentity { file_id, page_no })?;
        Some(self.frame_table[frame_id as usize].dirty)
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn disk(&self) -> &Manager {
        &self.disk
    }

    pub fn disk_mut(&mut self) -> &mut Manager {
        &mut self.disk
    }

    /// Checks that valid frames and page table entries form a bijection:
    /// every valid frame's owner maps back to that frame and every table
    /// entry points at a valid frame with the matching owner.
    pub fn verify_consistency(&self) -> Result<(), BufferError> {
        for (frame_id, header) in self.frame_table.iter().enumerate() {
            match (header.valid, header.owner) {
                (true, Some(owner)) => {
                    if self.page_table.lookup(owner) != Some(frame_id as FrameId) {
                        return Err(BufferError::Corrupted(frame_id as FrameId));
                    }
                }
                (false, None) => {}
                _ => return Err(BufferError::Corrupted(frame_id as FrameId)),
            }
        }

        for (identity, frame_id) in self.page_table.iter() {
            let header = self
                .frame_table
                .get(frame_id as usize)
                .ok_or(BufferError::Corrupted(frame_id))?;

            if !header.valid || header.owner != Some(identity) {
                return Err(BufferError::Corrupted(frame_id));
            }
        }

        Ok(())
    }

    /// Diagnostic listing of every frame. Non-semantic, debug logging only.
    pub fn dump(&self) {
        debug!(
            "buffer pool: {} frames, {} resident pages",
            self.num_frames,
            self.page_table.len()
        );

        for (frame_id, header) in self.frame_table.iter().enumerate() {
            match header.owner {
                Some(owner) => debug!(
                    "frame {frame_id}: file {} page {} pin_count={} dirty={} refbit={}",
                    owner.file_id, owner.page_no, header.pin_count, header.dirty, header.refbit
                ),
                None => debug!("frame {frame_id}: free"),
            }
        }
    }
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        // Last chance to get dirty pages onto disk. A destructor cannot
        // propagate, so failures are logged; callers that need to observe
        // them use shutdown() first.
        if let Err(err) = self.shutdown() {
            error!("write-back failed while dropping the buffer pool: {err}");
        }
    }
}
