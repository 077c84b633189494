pub mod action;
pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod io;
pub mod key;
pub mod mapping;
pub mod paths;
pub mod remote;
pub mod signal;
pub mod trigger;

pub use error::{BridgeError, Result};
