//! cveimport ingest - JSON host-dump parsing
//!
//! Reads the JSON dump format produced by host discovery: a top-level
//! array whose first element carries a `results` list of host tuples.

pub mod dump;

pub use dump::{parse_dump, parse_dump_file};
