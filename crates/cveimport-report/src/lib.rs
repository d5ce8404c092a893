//! cveimport report - GMP report document assembly
//!
//! Builds the container-report XML that gvmd accepts through
//! create_report: an outer report element carrying the format id, an inner
//! report with a results block (one result per host/CVE pair) and one host
//! asset block per host.

pub mod document;

pub use document::{Report, REPORT_FORMAT_ID};
