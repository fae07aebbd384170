use byteorder::{ByteOrder, LittleEndian};

use page_constants::PAGE_SIZE;

pub mod page_constants {
    // The frame size equals the disk manager's page size. All I/O moves
    // whole pages; nothing in this crate looks inside them.
    pub const PAGE_SIZE: usize = 1024 * 4;
}

/// One page worth of raw bytes. Doubles as the in-memory frame slot and
/// the unit handed to the disk manager.
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new() -> Self {
        Page {
            data: [0; PAGE_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    // Endian-explicit accessors so upper layers (and tests) can stamp
    // values into a page without their own codec.

    pub fn read_u32(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self.data[offset..offset + 4])
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        LittleEndian::write_u32(&mut self.data[offset..offset + 4], value);
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}
