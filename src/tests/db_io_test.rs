#[cfg(test)]
pub mod test {

    use tempfile::TempDir;

    use crate::storage::disk::manager::{DiskError, Manager};
    use crate::storage::page::page_constants::PAGE_SIZE;

    fn setup() -> (TempDir, Manager) {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = Manager::new(dir.path()).expect("disk manager");
        (dir, manager)
    }

    #[test]
    fn db_io_test() {
        let (_dir, mut manager) = setup();

        let page_data = [1u8; PAGE_SIZE];
        let mut page_buffer = [0u8; PAGE_SIZE];

        let (file_id, _) = manager.create_db_file().expect("File made");

        let page_id = manager.allocate_page(file_id).expect("page allocated");
        manager.write_page(file_id, page_id, &page_data).unwrap();
        manager
            .read_page(file_id, page_id, &mut page_buffer)
            .expect("Failed to read page");

        assert_eq!(page_data, page_buffer, "Page read mismatch!");
    }

    #[test]
    fn fresh_page_reads_back_zeroed() {
        let (_dir, mut manager) = setup();
        let (file_id, _) = manager.create_db_file().expect("File made");

        // allocate_page extends the file, so the page is readable before
        // its first write
        let page_id = manager.allocate_page(file_id).expect("page allocated");

        let mut page_buffer = [7u8; PAGE_SIZE];
        manager
            .read_page(file_id, page_id, &mut page_buffer)
            .expect("readable right after allocation");

        assert_eq!([0u8; PAGE_SIZE], page_buffer);
    }

    #[test]
    fn disposed_page_is_unreadable_and_recycled() {
        let (_dir, mut manager) = setup();
        let (file_id, _) = manager.create_db_file().expect("File made");

        let first = manager.allocate_page(file_id).expect("page allocated");
        let second = manager.allocate_page(file_id).expect("page allocated");
        assert_ne!(first, second);

        manager.dispose_page(file_id, first).expect("disposed");

        let mut page_buffer = [0u8; PAGE_SIZE];
        let err = manager
            .read_page(file_id, first, &mut page_buffer)
            .unwrap_err();
        assert!(matches!(err, DiskError::PageDisposed { .. }));

        let err = manager.dispose_page(file_id, first).unwrap_err();
        assert!(matches!(err, DiskError::PageDisposed { .. }));

        // the next allocation recycles the disposed slot
        let recycled = manager.allocate_page(file_id).expect("page allocated");
        assert_eq!(first, recycled);
    }

    #[test]
    fn unknown_file_and_page_errors() {
        let (_dir, mut manager) = setup();

        let mut page_buffer = [0u8; PAGE_SIZE];
        let err = manager.read_page(9999, 0, &mut page_buffer).unwrap_err();
        assert!(matches!(err, DiskError::UnknownFile(9999)));

        let (file_id, _) = manager.create_db_file().expect("File made");
        let err = manager
            .read_page(file_id, 42, &mut page_buffer)
            .unwrap_err();
        assert!(matches!(err, DiskError::PageNotAllocated { page_no: 42, .. }));
    }

    #[test]
    fn evicted_descriptors_are_reopened() {
        let (_dir, mut manager) = setup();

        // More files than the fd pool holds, with one page written in each
        let mut files = Vec::new();
        for seed in 0..12u8 {
            let (file_id, _) = manager.create_db_file().expect("File made");
            let page_id = manager.allocate_page(file_id).expect("page allocated");
            manager
                .write_page(file_id, page_id, &[seed; PAGE_SIZE])
                .expect("page written");
            files.push((file_id, page_id, seed));
        }

        // The earliest descriptors were evicted from the pool by now; reads
        // must still succeed through the reopen path
        for (file_id, page_id, seed) in files {
            let mut page_buffer = [0u8; PAGE_SIZE];
            manager
                .read_page(file_id, page_id, &mut page_buffer)
                .expect("readable after fd eviction");
            assert_eq!([seed; PAGE_SIZE], page_buffer);
        }
    }
}
