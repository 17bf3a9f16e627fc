pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod options;
pub mod output;
pub mod store;
