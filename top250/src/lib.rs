// Library exports for the binary and integration tests

pub mod analysis;
pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod state;
pub mod store;
pub mod types;
