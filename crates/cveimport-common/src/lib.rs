//! cveimport common - configuration and logging setup

pub mod config;
pub mod logging;

pub use config::Config;
