pub mod buffer;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod tests;
