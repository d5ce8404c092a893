//! cveimport gmp - client for the Greenbone Management Protocol
//!
//! This crate provides:
//! - The `Gmp` trait: the operations the import pipeline needs from a
//!   management server (SecInfo queries, container tasks, report import)
//! - `GmpClient`: a blocking client speaking GMP XML commands over a byte
//!   stream, with a Unix domain socket constructor for gvmd
//! - `GmpResponse`/`InfoType`: response envelope and SecInfo class selector
//!
//! No crates.io client exists for GMP, so the thin command/response layer
//! lives here behind the trait; everything above this crate treats the
//! protocol surface as external.

pub mod client;
pub mod types;

pub use client::{Gmp, GmpClient};
pub use types::{GmpResponse, InfoType};
