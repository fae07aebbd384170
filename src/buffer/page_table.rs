use hashlink::LinkedHashMap;
use thiserror::Error;

use crate::buffer::buffer_pool_manager::{FileId, FrameId, PageId};

/// Names one page on stable storage: the owning file plus its page number.
/// Equality over both fields is the page table's lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageIdentity {
    pub file_id: FileId,
    pub page_no: PageId,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageTableError {
    #[error("page {} of file {} is already mapped to frame {}", .identity.page_no, .identity.file_id, .frame_id)]
    DuplicateEntry {
        identity: PageIdentity,
        frame_id: FrameId,
    },

    #[error("page {} of file {} has no page table entry", .identity.page_no, .identity.file_id)]
    MissingEntry { identity: PageIdentity },
}

/// Maps the identity of every resident page to the frame holding it.
///
/// Only the buffer pool manager mutates this table, and always in the same
/// operation that mutates the matching frame header, so the two stay
/// mutually consistent.
pub struct PageTable {
    entries: LinkedHashMap<PageIdentity, FrameId>,
}

impl PageTable {
    pub fn new() -> Self {
        PageTable {
            entries: LinkedHashMap::new(),
        }
    }

    pub fn lookup(&self, identity: PageIdentity) -> Option<FrameId> {
        self.entries.get(&identity).copied()
    }

    pub fn insert(&mut self, identity: PageIdentity, frame_id: FrameId) -> Result<(), PageTableError> {
        if let Some(&mapped) = self.entries.get(&identity) {
            return Err(PageTableError::DuplicateEntry {
                identity,
                frame_id: mapped,
            });
        }

        self.entries.insert(identity, frame_id);
        Ok(())
    }

    pub fn remove(&mut self, identity: PageIdentity) -> Result<FrameId, PageTableError> {
        self.entries
            .remove(&identity)
            .ok_or(PageTableError::MissingEntry { identity })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PageIdentity, FrameId)> + '_ {
        self.entries.iter().map(|(identity, frame)| (*identity, *frame))
    }
}

impl Default for PageTable {
    fn default() -> Self {
        PageTable::new()
    }
}
