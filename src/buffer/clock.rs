use log::debug;

use crate::{
    buffer::{
        buffer_pool_manager::{BufferError, FrameHeader, FrameId},
        page_table::PageTable,
    },
    storage::{disk::manager::Manager, page::Page},
};

/// Second-chance (clock) frame allocator.
///
/// Owns the clock hand, which persists between calls: every allocation
/// resumes the circular scan where the previous one stopped.
pub struct ClockAllocator {
    hand: usize,
    num_frames: usize,
}

impl ClockAllocator {
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "clock needs at least one frame");

        // Start one step behind frame 0 so the first advance examines it
        ClockAllocator {
            hand: num_frames - 1,
            num_frames,
        }
    }

    fn advance(&mut self) -> usize {
        self.hand = (self.hand + 1) % self.num_frames;
        self.hand
    }

    /// Finds or frees exactly one frame, evicting (and writing back) a
    /// resident page when necessary. On success the returned frame is
    /// invalid and unpinned.
    ///
    /// The scan is bounded to two full sweeps: the first sweep may be
    /// defeated by granting second chances, but it strips every refbit it
    /// visits and nothing re-sets them mid-scan, so the second sweep must
    /// settle on a frame unless every frame is pinned.
    pub fn allocate(
        &mut self,
        frame_table: &mut [FrameHeader],
        pool: &mut [Page],
        page_table: &mut PageTable,
        disk: &mut Manager,
    ) -> Result<FrameId, BufferError> {
        for _ in 0..self.num_frames * 2 {
            let frame_id = self.advance();
            let header = &mut frame_table[frame_id];

            // 1. An invalid frame is immediately usable
            if !header.valid {
                return Ok(frame_id as FrameId);
            }

            // 2. Recently touched frames get one more trip around the clock
            if header.refbit {
                header.refbit = false;
                continue;
            }

            // 3. Pinned frames are not eligible
            if header.pin_count > 0 {
                continue;
            }

            let owner = match header.owner {
                Some(owner) => owner,
                None => return Err(BufferError::Corrupted(frame_id as FrameId)),
            };

            // 4. Victim found. A dirty page goes back to disk first; if the
            // write fails the frame is left exactly as it was (dirty bit
            // still set, hand parked here) and the failure surfaces.
            if header.dirty {
                disk.write_page(owner.file_id, owner.page_no, pool[frame_id].as_bytes())?;
                header.dirty = false;
            }

            debug!(
                "evicting page {} of file {} from frame {frame_id}",
                owner.page_no, owner.file_id
            );

            // 5. Drop the identity mapping and hand out the cleared frame
            page_table.remove(owner)?;
            header.clear();

            return Ok(frame_id as FrameId);
        }

        Err(BufferError::PoolExhausted(self.num_frames))
    }
}
