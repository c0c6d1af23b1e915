pub mod analytics;
pub mod config;
pub mod domain;
pub mod error;
