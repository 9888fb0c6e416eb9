pub mod api;
pub mod config;
pub mod connect;
pub mod google;
pub mod models;
pub mod session;
pub mod storage;
