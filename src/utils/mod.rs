pub mod fdpool;
