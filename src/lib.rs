pub mod config;
pub mod feed;
pub mod scheduler;
pub mod storage;
