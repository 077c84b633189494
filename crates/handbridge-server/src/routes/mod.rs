pub mod config;
pub mod health;
pub mod ingest;
pub mod mapping;
pub mod signals;
pub mod status;
pub mod triggers;
