use std::{fs::File, io, os::unix::fs::MetadataExt};

use hashlink::LinkedHashMap;

/// Bounded cache of open file descriptors, keyed by inode number.
///
/// Insertion order of the map doubles as recency order: a refreshed entry
/// is moved to the back, `pop_front` yields the least recently used one.
pub struct FdPool {
    capacity: usize,
    descriptors: LinkedHashMap<u64, File>,
}

impl FdPool {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "fd pool needs room for at least one file");

        FdPool {
            capacity,
            descriptors: LinkedHashMap::with_capacity(capacity),
        }
    }

    // Registers a descriptor and returns its file id together with the id
    // of a descriptor that had to be evicted to make room, if any.
    pub fn set(&mut self, file: File) -> io::Result<(u64, Option<u64>)> {
        let file_id = file.metadata()?.ino();

        if let Some(open) = self.descriptors.remove(&file_id) {
            // Already cached. Refresh its position and keep the handle we
            // had, the fresh one is a duplicate.
            self.descriptors.insert(file_id, open);
            return Ok((file_id, None));
        }

        let evicted = if self.descriptors.len() == self.capacity {
            self.descriptors.pop_front().map(|(id, _)| id)
        } else {
            None
        };

        self.descriptors.insert(file_id, file);
        Ok((file_id, evicted))
    }

    pub fn get(&mut self, file_id: u64) -> Option<&File> {
        let file = self.descriptors.remove(&file_id)?;
        self.descriptors.insert(file_id, file);
        self.descriptors.get(&file_id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
