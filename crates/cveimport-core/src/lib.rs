//! cveimport core - foundation types and error handling
//!
//! This crate provides the abstractions shared by the import pipeline:
//! - `HostRecord`: one host entry from a JSON host dump
//! - `Severity`: CVSS-derived severity buckets
//! - `Error`/`Result`: the error taxonomy for the whole workspace

pub mod error;
pub mod host;
pub mod severity;

pub use error::{Error, Result};
pub use host::HostRecord;
pub use severity::Severity;
