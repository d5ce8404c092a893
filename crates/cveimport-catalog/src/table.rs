//! CSV-backed CPE to CVE lookup table
//!
//! One row per (CPE, CVE) association: `'<cpe>','<cve-id>','<cvss>'`,
//! single-quoted fields. The table is scanned front to back on every
//! lookup; there is no index and no caching.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use csv::ReaderBuilder;
use cveimport_core::{Error, Result};
use tracing::{info, warn};

/// Lookup result: queried CPE -> (CVE id -> CVSS score)
///
/// Every queried CPE is present as a key, with an empty inner map when
/// nothing matched.
pub type VulnMap = BTreeMap<String, BTreeMap<String, f32>>;

/// Handle on the on-disk lookup table
#[derive(Debug)]
pub struct CpeTable {
    path: PathBuf,
}

impl CpeTable {
    /// Open the table at `path`; missing files are a fatal error that tells
    /// the operator how to create one
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingListFile {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collect every CVE/score pair whose CPE column contains one of the
    /// queried CPEs as a substring
    pub fn lookup(&self, cpes: &[String]) -> Result<VulnMap> {
        let start = Instant::now();
        let mut vulns: VulnMap = cpes
            .iter()
            .map(|cpe| (cpe.clone(), BTreeMap::new()))
            .collect();
        if cpes.is_empty() {
            return Ok(vulns);
        }

        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quote(b'\'')
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut rows = 0u64;
        let mut found = 0u64;
        for record in reader.records() {
            rows += 1;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!("skipping unreadable list row {}: {}", rows, e);
                    continue;
                }
            };
            if record.len() < 3 {
                warn!("skipping short list row {}", rows);
                continue;
            }

            let cpe_column = record.get(0).unwrap_or_default();
            let cve = record.get(1).unwrap_or_default().trim_matches('\'');
            let score_text = record.get(2).unwrap_or_default().trim_matches('\'');
            let score: f32 = match score_text.parse() {
                Ok(s) => s,
                Err(_) => {
                    warn!("skipping list row {} with score {:?}", rows, score_text);
                    continue;
                }
            };

            for cpe in cpes {
                if cpe_column.contains(cpe.as_str()) {
                    if let Some(cves) = vulns.get_mut(cpe) {
                        cves.insert(cve.to_string(), score);
                        found += 1;
                    }
                }
            }
        }

        info!(
            "matched {} CVEs for {} CPEs over {} list rows in {:?}",
            found,
            cpes.len(),
            rows,
            start.elapsed()
        );
        Ok(vulns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn table_with(rows: &str) -> (tempfile::TempDir, CpeTable) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpes.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(rows.as_bytes()).unwrap();
        (dir, CpeTable::open(&path).unwrap())
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = CpeTable::open("/nonexistent/cpes.csv").unwrap_err();
        assert!(matches!(err, Error::MissingListFile { .. }));
    }

    #[test]
    fn test_lookup_returns_all_matching_pairs() {
        let (_dir, table) = table_with(
            "'cpe:/a:apache:log4j:2.14.1','CVE-2021-44228','10.0'\n\
             'cpe:/a:apache:log4j:2.14.1','CVE-2021-45046','9.0'\n\
             'cpe:/a:openbsd:openssh:8.4','CVE-2021-41617','7.0'\n",
        );

        let query = vec![String::from("cpe:/a:apache:log4j:2.14.1")];
        let vulns = table.lookup(&query).unwrap();
        let cves = &vulns["cpe:/a:apache:log4j:2.14.1"];
        assert_eq!(cves.len(), 2);
        assert_eq!(cves["CVE-2021-44228"], 10.0);
        assert_eq!(cves["CVE-2021-45046"], 9.0);
    }

    #[test]
    fn test_lookup_is_substring_containment() {
        let (_dir, table) = table_with(
            "'cpe:/a:apache:log4j:2.14.1','CVE-2021-44228','10.0'\n\
             'cpe:/a:apache:log4j:2.15.0','CVE-2021-45046','9.0'\n",
        );

        // A version-less prefix matches every versioned row.
        let query = vec![String::from("cpe:/a:apache:log4j")];
        let vulns = table.lookup(&query).unwrap();
        assert_eq!(vulns["cpe:/a:apache:log4j"].len(), 2);
    }

    #[test]
    fn test_unmatched_cpe_keeps_empty_entry() {
        let (_dir, table) = table_with("'cpe:/a:apache:log4j:2.14.1','CVE-2021-44228','10.0'\n");

        let query = vec![String::from("cpe:/a:nginx:nginx:1.18.0")];
        let vulns = table.lookup(&query).unwrap();
        assert!(vulns["cpe:/a:nginx:nginx:1.18.0"].is_empty());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let (_dir, table) = table_with(
            "'cpe:/a:apache:log4j:2.14.1','CVE-2021-44228','10.0'\n\
             'cpe:/a:apache:log4j:2.14.1','CVE-9999-1'\n\
             'cpe:/a:apache:log4j:2.14.1','CVE-9999-2','not-a-score'\n",
        );

        let query = vec![String::from("cpe:/a:apache:log4j:2.14.1")];
        let vulns = table.lookup(&query).unwrap();
        assert_eq!(vulns["cpe:/a:apache:log4j:2.14.1"].len(), 1);
    }

    #[test]
    fn test_empty_query() {
        let (_dir, table) = table_with("'cpe:/a:apache:log4j:2.14.1','CVE-2021-44228','10.0'\n");
        assert!(table.lookup(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_repeated_lookups_rescan_from_start() {
        let (_dir, table) = table_with("'cpe:/a:apache:log4j:2.14.1','CVE-2021-44228','10.0'\n");

        let query = vec![String::from("cpe:/a:apache:log4j:2.14.1")];
        for _ in 0..2 {
            let vulns = table.lookup(&query).unwrap();
            assert_eq!(vulns["cpe:/a:apache:log4j:2.14.1"].len(), 1);
        }
    }
}
