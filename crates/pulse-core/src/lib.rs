pub mod config;
pub mod export;
pub mod format;
pub mod summary;
pub mod table;
