//! JSON host-dump parser
//!
//! Host tuples use a fixed positional schema:
//! index 0 = name, 1 = ip or list of ips, 2 = ip range, 3 = OS text,
//! 4 = OS CPE, 7 = CPE or list of CPEs of detected applications.
//! A missing or null OS field makes the whole dump malformed; everything
//! else degrades to empty values.

use std::fs;
use std::path::Path;

use cveimport_core::{Error, HostRecord, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

const FIELD_NAME: usize = 0;
const FIELD_IPS: usize = 1;
const FIELD_IP_RANGE: usize = 2;
const FIELD_OS: usize = 3;
const FIELD_OS_CPE: usize = 4;
const FIELD_CPES: usize = 7;

/// Parse a host dump file
pub fn parse_dump_file(path: impl AsRef<Path>) -> Result<Vec<HostRecord>> {
    let path = path.as_ref();
    info!("parsing host dump {}", path.display());
    let content = fs::read_to_string(path)?;
    parse_dump(&content)
}

/// Parse host dump content
pub fn parse_dump(json: &str) -> Result<Vec<HostRecord>> {
    let value: Value = serde_json::from_str(json)?;
    let results = value
        .get(0)
        .and_then(|first| first.get("results"))
        .and_then(|results| results.as_array())
        .ok_or_else(|| {
            Error::MalformedDump(String::from(
                "expected a top-level array whose first element carries a `results` list",
            ))
        })?;

    let mut hosts = Vec::with_capacity(results.len());
    for (index, entry) in results.iter().enumerate() {
        let entry = entry.as_array().ok_or_else(|| {
            Error::MalformedDump(format!("host entry {} is not a tuple", index))
        })?;

        let os = entry
            .get(FIELD_OS)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::MalformedDump(format!("host entry {} has no operating system", index))
            })?;

        let name = string_at(entry, FIELD_NAME);
        let ips = strings_at(entry, FIELD_IPS);
        if ips.is_empty() {
            warn!("host entry {} ({}) carries no addresses", index, name);
        }

        let host = HostRecord {
            name,
            ips,
            ip_range: entry
                .get(FIELD_IP_RANGE)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            os: os.to_string(),
            os_cpe: string_at(entry, FIELD_OS_CPE),
            cpes: strings_at(entry, FIELD_CPES),
        };
        debug!(
            "host {} ({} addresses, {} CPEs)",
            host.name,
            host.ips.len(),
            host.cpes.len()
        );
        hosts.push(host);
    }

    info!("parsed {} hosts", hosts.len());
    Ok(hosts)
}

/// Single string field, empty when missing or null
fn string_at(entry: &[Value], index: usize) -> String {
    entry
        .get(index)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// String-or-list field normalized to a list, empty entries dropped
fn strings_at(entry: &[Value], index: usize) -> Vec<String> {
    match entry.get(index) {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
