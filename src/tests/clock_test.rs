#[cfg(test)]
pub mod test {

    use tempfile::TempDir;

    use crate::buffer::buffer_pool_manager::{BufferError, BufferPoolManager, FileId};
    use crate::storage::disk::manager::{DiskError, Manager};

    fn setup(num_frames: usize) -> (TempDir, BufferPoolManager, FileId) {
        let dir = tempfile::tempdir().expect("temp dir");
        let disk = Manager::new(dir.path()).expect("disk manager");
        let mut pool = BufferPoolManager::new(num_frames, disk);
        let file_id = pool.create_file().expect("db file");
        (dir, pool, file_id)
    }

    #[test]
    fn second_chance_spares_recently_touched_page() {
        let (_dir, mut pool, file) = setup(3);

        // Fill the pool; frames are handed out in clock order
        let (p1, f1) = pool.new_page(file).expect("new page");
        let (p2, f2) = pool.new_page(file).expect("new page");
        let (p3, f3) = pool.new_page(file).expect("new page");
        assert_eq!((0, 1, 2), (f1, f2, f3));

        for page_no in [p1, p2, p3] {
            pool.unpin_page(file, page_no, false).expect("unpin");
        }

        // Everything has its refbit granted, so the first sweep strips them
        // all and the second sweep evicts the first unpinned frame: p1
        let (p4, f4) = pool.new_page(file).expect("new page");
        assert_eq!(f1, f4);
        assert!(pool.pin_count(file, p1).is_none());
        pool.unpin_page(file, p4, false).expect("unpin");

        // Touch p2: its refbit buys it one more trip around the clock, so
        // the next eviction falls through to p3
        let _ = pool.fetch_page(file, p2).expect("fetch hit");
        pool.unpin_page(file, p2, false).expect("unpin");

        let (_p5, f5) = pool.new_page(file).expect("new page");
        assert_eq!(f3, f5);
        assert!(pool.pin_count(file, p2).is_some());
        assert!(pool.pin_count(file, p3).is_none());

        pool.verify_consistency().expect("consistent pool");
    }

    #[test]
    fn pinned_frames_are_never_victims() {
        let (_dir, mut pool, file) = setup(2);

        let (p1, _) = pool.new_page(file).expect("new page");
        let (p2, f2) = pool.new_page(file).expect("new page");
        pool.unpin_page(file, p2, false).expect("unpin");

        // p1 stays pinned; the scan must pass it over and take p2's frame
        let (_p3, f3) = pool.new_page(file).expect("new page");
        assert_eq!(f2, f3);
        assert_eq!(Some(1), pool.pin_count(file, p1));
        assert!(pool.pin_count(file, p2).is_none());

        pool.verify_consistency().expect("consistent pool");
    }

    #[test]
    fn failed_writeback_aborts_eviction_without_side_effects() {
        let (_dir, mut pool, file) = setup(2);

        // Three pages on disk, then an empty pool to refetch them into
        let mut pages = Vec::new();
        for _ in 0..3 {
            let (page_no, _) = pool.new_page(file).expect("new page");
            pool.unpin_page(file, page_no, false).expect("unpin");
            pages.push(page_no);
        }
        pool.flush_file(file).expect("flush of clean pages");

        let victim_frame = pool.fetch_page(file, pages[0]).expect("fetch");
        pool.page_mut(victim_frame).write_u32(0, 0xBEEF);
        pool.unpin_page(file, pages[0], true).expect("unpin dirty");
        pool.fetch_page(file, pages[1]).expect("fetch");

        // Pull the disk slot out from under the dirty page so its
        // write-back cannot succeed
        pool.disk_mut()
            .dispose_page(file, pages[0])
            .expect("dispose disk slot");

        // pages[1] is pinned, so the only candidate is the dirty frame;
        // the failed write-back must abort the allocation outright
        let err = pool.fetch_page(file, pages[2]).unwrap_err();
        assert!(matches!(
            err,
            BufferError::Disk(DiskError::PageDisposed { .. })
        ));

        // No partial eviction: the frame is still valid, dirty, registered
        assert_eq!(Some(0), pool.pin_count(file, pages[0]));
        assert_eq!(Some(true), pool.is_dirty(file, pages[0]));
        pool.verify_consistency().expect("consistent pool");

        // The failure is stable across retries, and the page itself is
        // still servable from its frame
        let err = pool.fetch_page(file, pages[2]).unwrap_err();
        assert!(matches!(err, BufferError::Disk(_)));

        let hit = pool.fetch_page(file, pages[0]).expect("fetch hit");
        assert_eq!(victim_frame, hit);
        assert_eq!(0xBEEF, pool.page(hit).read_u32(0));
    }

    #[test]
    fn fully_pinned_pool_is_exhausted() {
        let (_dir, mut pool, file) = setup(2);

        let (p1, _) = pool.new_page(file).expect("new page");
        let (p2, _) = pool.new_page(file).expect("new page");

        let err = pool.new_page(file).unwrap_err();
        assert!(matches!(err, BufferError::PoolExhausted(2)));

        // The failed scan changed nothing observable
        assert_eq!(Some(1), pool.pin_count(file, p1));
        assert_eq!(Some(1), pool.pin_count(file, p2));
        pool.verify_consistency().expect("consistent pool");

        // Releasing a single pin makes allocation possible again
        pool.unpin_page(file, p1, false).expect("unpin");
        pool.new_page(file).expect("one evictable frame suffices");
    }
}
