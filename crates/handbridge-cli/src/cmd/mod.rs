pub mod config;
pub mod init;
pub mod mapping;
pub mod send;
pub mod serve;
pub mod signal;
