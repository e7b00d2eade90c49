pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod ncbi;
pub mod output;
pub mod store;
pub mod transfer;
