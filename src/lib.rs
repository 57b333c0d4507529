pub mod config;
pub mod fetch;
pub mod logs;
pub mod render;
pub mod server;
pub mod storage;
pub mod utils;
