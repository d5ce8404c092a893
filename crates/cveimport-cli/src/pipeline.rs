//! The import pipeline: dump -> CPE resolution -> CVE lookup -> report

use std::path::Path;

use chrono::Local;
use cveimport_catalog::cpe::Cpe;
use cveimport_catalog::sync::{self, CatalogSync};
use cveimport_catalog::table::CpeTable;
use cveimport_core::{Result, Severity};
use cveimport_gmp::Gmp;
use cveimport_ingest::parse_dump_file;
use cveimport_report::Report;
use tracing::{debug, info};

/// Build or refresh the lookup list from the server's CVE feed
pub fn create_list(gmp: &mut dyn Gmp, list_path: &Path, page_size: u64) -> Result<()> {
    info!("generating CPE to CVE list at {}", list_path.display());
    let stats = CatalogSync::new(gmp).page_size(page_size).run(list_path)?;
    info!(
        "list complete: {} rows for {} of {} CVEs",
        stats.rows_written, stats.cves_processed, stats.total
    );
    Ok(())
}

/// Import a JSON host dump as a CVE report; returns the server-side report
/// id
pub fn import_dump(gmp: &mut dyn Gmp, dump_path: &Path, list_path: &Path) -> Result<String> {
    let table = CpeTable::open(list_path)?;
    let hosts = parse_dump_file(dump_path)?;

    let mut report = Report::new();
    let stamp = Local::now();
    let mut matched = 0usize;
    let mut worst = Severity::Info;

    for host in &hosts {
        let os_cpe = if host.os_cpe.is_empty() {
            String::new()
        } else {
            Cpe::parse(&host.os_cpe)?.to_uri_22()
        };

        let mut cpes: Vec<String> = Vec::new();
        for raw in &host.cpes {
            cpes.extend(resolve_cpe(gmp, raw)?);
        }
        if cpes.is_empty() {
            debug!("host {} carries no usable CPEs, skipping", host.name);
            continue;
        }

        let vulns = table.lookup(&cpes)?;
        for scores in vulns.values() {
            for &cvss in scores.values() {
                matched += 1;
                worst = worst.max(Severity::from_cvss(cvss));
            }
        }

        for ip in &host.ips {
            report.add_host_results(ip, &host.name, &vulns, &host.os, &os_cpe, stamp);
        }
    }

    info!(
        "assembled {} results over {} host entries ({} CVE matches, worst severity {})",
        report.result_count(),
        report.host_count(),
        matched,
        worst
    );

    let task_name = format!("CVE_Scan_Report_{}", stamp.format("%Y/%m/%d-%H:%M:%S"));
    let task_id = gmp.create_container_task(&task_name, "Imported with cveimport")?;
    debug!("created container task {}", task_id);

    let report_id = gmp.import_report(&report.to_xml()?, &task_id, true)?;
    info!("sent report {}", report_id);
    Ok(report_id)
}

/// Resolve one dump CPE to the v2.2 URIs to match against the lookup list
///
/// Version-bearing CPEs are used directly; version-less ones are expanded
/// through the server to every versioned CPE it knows under that prefix.
fn resolve_cpe(gmp: &mut dyn Gmp, raw: &str) -> Result<Vec<String>> {
    let cpe = Cpe::parse(raw)?;
    let uri = cpe.to_uri_22();
    if cpe.has_version() {
        return Ok(vec![uri]);
    }
    sync::expand_unversioned(gmp, &uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cveimport_core::Error;
    use cveimport_gmp::{GmpResponse, InfoType};

    /// Records submissions; get_info answers with a single versioned CPE
    struct RecordingGmp {
        imported: Option<(String, String)>,
    }

    impl RecordingGmp {
        fn new() -> Self {
            Self { imported: None }
        }
    }

    impl Gmp for RecordingGmp {
        fn get_info_list(&mut self, _info_type: InfoType, _filter: &str) -> Result<GmpResponse> {
            GmpResponse::parse(String::from(
                r#"<get_info_response status="200">
                    <info id="cpe:/a:openbsd:openssh:8.4"><cpe/></info>
                    <info start="1" max="-1"/>
                </get_info_response>"#,
            ))
        }

        fn create_container_task(&mut self, name: &str, _comment: &str) -> Result<String> {
            assert!(name.starts_with("CVE_Scan_Report_"));
            Ok(String::from("task-1"))
        }

        fn import_report(
            &mut self,
            report: &str,
            task_id: &str,
            in_assets: bool,
        ) -> Result<String> {
            assert!(in_assets);
            self.imported = Some((report.to_string(), task_id.to_string()));
            Ok(String::from("report-1"))
        }
    }

    fn write_fixtures(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let list = dir.join("cpes.csv");
        std::fs::write(
            &list,
            "'cpe:/a:apache:http_server:2.4.41','CVE-2021-26691','9.8'\n\
             'cpe:/a:openbsd:openssh:8.4','CVE-2021-41617','7.0'\n",
        )
        .unwrap();

        let dump = dir.join("hosts.json");
        std::fs::write(
            &dump,
            r#"[{"results": [[
                "web1",
                "10.0.0.1",
                null,
                "Ubuntu 20.04",
                "cpe:2.3:o:canonical:ubuntu_linux:20.04:*:*:*:*:*:*:*",
                null,
                null,
                [
                    "cpe:2.3:a:apache:http_server:2.4.41:*:*:*:*:*:*:*",
                    "cpe:2.3:a:openbsd:openssh:*:*:*:*:*:*:*:*"
                ]
            ]]}]"#,
        )
        .unwrap();

        (list, dump)
    }

    #[test]
    fn test_import_dump_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (list, dump) = write_fixtures(dir.path());

        let mut gmp = RecordingGmp::new();
        let report_id = import_dump(&mut gmp, &dump, &list).unwrap();
        assert_eq!(report_id, "report-1");

        let (report_xml, task_id) = gmp.imported.unwrap();
        assert_eq!(task_id, "task-1");
        // Direct version-bearing match plus the server-expanded one.
        assert!(report_xml.contains("CVE-2021-26691"));
        assert!(report_xml.contains("CVE-2021-41617"));
        assert!(report_xml.contains("<value>cpe:/o:canonical:ubuntu_linux:20.04</value>"));
    }

    #[test]
    fn test_import_dump_missing_list() {
        let dir = tempfile::tempdir().unwrap();
        let (_, dump) = write_fixtures(dir.path());

        let mut gmp = RecordingGmp::new();
        let err = import_dump(&mut gmp, &dump, &dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingListFile { .. }));
    }
}
