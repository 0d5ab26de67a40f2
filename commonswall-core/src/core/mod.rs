pub mod app;
pub mod cache;
pub mod database;
pub mod request;
pub mod selector;
pub mod storage;
