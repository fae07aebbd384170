pub mod buffer_pool_manager;
pub mod clock;
pub mod page_table;
