//! cveimport catalog - CPE identifiers and the CPE to CVE lookup table
//!
//! This crate provides:
//! - `Cpe`: CPE v2.3/v2.2 parsing and conversion between the two forms
//! - `CpeTable`: the CSV-backed CPE to CVE lookup table
//! - `CatalogSync`: building the table from the server's CVE feed

pub mod cpe;
pub mod sync;
pub mod table;

pub use cpe::{Cpe, CpePart};
pub use sync::CatalogSync;
pub use table::{CpeTable, VulnMap};
