//! Report document model and XML rendering

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Local};
use cveimport_core::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use uuid::Uuid;

/// Report format id of the XML container format gvmd imports
pub const REPORT_FORMAT_ID: &str = "d5da9f67-8551-4e51-807b-b6a873d70e34";

const SOURCE_NAME: &str = "cveimport";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// A report document under assembly
///
/// Hosts are added one at a time with their matched vulnerabilities; the
/// finished document is rendered once with `to_xml`.
pub struct Report {
    id: String,
    name: String,
    results: Vec<ScanResult>,
    hosts: Vec<HostAsset>,
}

/// One result element: a CVE matched on a host address
struct ScanResult {
    id: String,
    ip: String,
    hostname: String,
    cve: String,
    cvss: f32,
    stamp: String,
}

/// One host asset block with its detail entries
struct HostAsset {
    ip: String,
    details: Vec<Detail>,
}

struct Detail {
    name: String,
    value: String,
    source_name: String,
    source_type: Option<String>,
    source_description: Option<String>,
}

impl Detail {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            source_name: SOURCE_NAME.to_string(),
            source_type: None,
            source_description: None,
        }
    }

    fn described(name: &str, value: &str, description: &str) -> Self {
        Self {
            source_description: Some(description.to_string()),
            ..Self::new(name, value)
        }
    }

    /// An `App` entry tying a product CPE to the CVE that matched it
    fn app(cpe: &str, cve: &str) -> Self {
        Self {
            source_name: cve.to_string(),
            source_type: Some(String::from("cve")),
            source_description: Some(String::from("CVE Scanner")),
            ..Self::new("App", cpe)
        }
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::from("Report created from JSON file"),
            results: Vec::new(),
            hosts: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Add one host address with its matched vulnerabilities
    ///
    /// `vulns` maps each queried CPE to the CVE/score pairs it matched;
    /// CPEs with no matches still contribute the host's asset details, just
    /// no result elements.
    pub fn add_host_results(
        &mut self,
        ip: &str,
        hostname: &str,
        vulns: &BTreeMap<String, BTreeMap<String, f32>>,
        os: &str,
        os_cpe: &str,
        stamp: DateTime<Local>,
    ) {
        let stamp = stamp.format(TIME_FORMAT).to_string();

        let mut details = vec![
            Detail::new("hostname", hostname),
            Detail::described("best_os_txt", os, "Host Details"),
            Detail::described("best_os_cpe", os_cpe, "Host Details"),
        ];

        for (cpe, cves) in vulns {
            for (cve, cvss) in cves {
                self.results.push(ScanResult {
                    id: Uuid::new_v4().to_string(),
                    ip: ip.to_string(),
                    hostname: hostname.to_string(),
                    cve: cve.clone(),
                    cvss: *cvss,
                    stamp: stamp.clone(),
                });
                details.push(Detail::app(cpe, cve));
            }
        }

        self.hosts.push(HostAsset {
            ip: ip.to_string(),
            details,
        });
    }

    /// Render the finished document
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        let mut outer = BytesStart::new("report");
        outer.push_attribute(("id", self.id.as_str()));
        outer.push_attribute(("format_id", REPORT_FORMAT_ID));
        outer.push_attribute(("extension", "xml"));
        outer.push_attribute(("content_type", "text/xml"));
        writer.write_event(Event::Start(outer))?;

        writer.write_event(Event::Start(BytesStart::new("owner")))?;
        text_element(&mut writer, "name", "")?;
        writer.write_event(Event::End(BytesEnd::new("owner")))?;
        text_element(&mut writer, "name", &self.name)?;

        let mut inner = BytesStart::new("report");
        inner.push_attribute(("id", self.id.as_str()));
        writer.write_event(Event::Start(inner))?;

        let mut ports = BytesStart::new("ports");
        ports.push_attribute(("start", "1"));
        ports.push_attribute(("max", "-1"));
        writer.write_event(Event::Empty(ports))?;

        let mut results = BytesStart::new("results");
        results.push_attribute(("start", "1"));
        results.push_attribute(("max", "-1"));
        writer.write_event(Event::Start(results))?;
        for result in &self.results {
            write_result(&mut writer, result)?;
        }
        writer.write_event(Event::End(BytesEnd::new("results")))?;

        for host in &self.hosts {
            write_host(&mut writer, host)?;
        }

        writer.write_event(Event::End(BytesEnd::new("report")))?;
        writer.write_event(Event::End(BytesEnd::new("report")))?;

        Ok(String::from_utf8(writer.into_inner())?)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

fn write_result<W: Write>(writer: &mut Writer<W>, result: &ScanResult) -> Result<()> {
    let mut start = BytesStart::new("result");
    start.push_attribute(("id", result.id.as_str()));
    writer.write_event(Event::Start(start))?;

    text_element(writer, "name", &format!("Result for host {}", result.ip))?;
    text_element(writer, "comment", "Imported with cveimport")?;
    text_element(writer, "creation_time", &result.stamp)?;
    text_element(writer, "modification_time", &result.stamp)?;

    // host element: address as text, hostname as a child
    writer.write_event(Event::Start(BytesStart::new("host")))?;
    writer.write_event(Event::Text(BytesText::new(&result.ip)))?;
    text_element(writer, "hostname", &result.hostname)?;
    writer.write_event(Event::End(BytesEnd::new("host")))?;

    let mut nvt = BytesStart::new("nvt");
    nvt.push_attribute(("oid", result.cve.as_str()));
    writer.write_event(Event::Start(nvt))?;
    text_element(writer, "type", "cve")?;
    text_element(writer, "name", &result.cve)?;
    text_element(writer, "cvss_base", &score_text(result.cvss))?;
    text_element(writer, "cve", &result.cve)?;
    writer.write_event(Event::End(BytesEnd::new("nvt")))?;

    text_element(writer, "severity", &score_text(result.cvss))?;

    writer.write_event(Event::End(BytesEnd::new("result")))?;
    Ok(())
}

fn write_host<W: Write>(writer: &mut Writer<W>, host: &HostAsset) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("host")))?;
    text_element(writer, "ip", &host.ip)?;
    for detail in &host.details {
        write_detail(writer, detail)?;
    }
    writer.write_event(Event::End(BytesEnd::new("host")))?;
    Ok(())
}

fn write_detail<W: Write>(writer: &mut Writer<W>, detail: &Detail) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("detail")))?;
    text_element(writer, "name", &detail.name)?;
    text_element(writer, "value", &detail.value)?;

    writer.write_event(Event::Start(BytesStart::new("source")))?;
    text_element(writer, "name", &detail.source_name)?;
    if let Some(source_type) = &detail.source_type {
        text_element(writer, "type", source_type)?;
    }
    if let Some(description) = &detail.source_description {
        text_element(writer, "description", description)?;
    }
    writer.write_event(Event::End(BytesEnd::new("source")))?;

    writer.write_event(Event::End(BytesEnd::new("detail")))?;
    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    if !value.is_empty() {
        writer.write_event(Event::Text(BytesText::new(value)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// CVSS scores always render with one decimal, the way the feed carries them
fn score_text(score: f32) -> String {
    format!("{:.1}", score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    fn sample_vulns() -> BTreeMap<String, BTreeMap<String, f32>> {
        let mut cves = BTreeMap::new();
        cves.insert(String::from("CVE-2021-44228"), 10.0);
        cves.insert(String::from("CVE-2021-45046"), 9.0);

        let mut vulns = BTreeMap::new();
        vulns.insert(String::from("cpe:/a:apache:log4j:2.14.1"), cves);
        vulns.insert(
            String::from("cpe:/a:openbsd:openssh:8.4"),
            BTreeMap::new(),
        );
        vulns
    }

    fn build_sample() -> Report {
        let mut report = Report::new();
        report.add_host_results(
            "10.0.0.1",
            "web1",
            &sample_vulns(),
            "Ubuntu 20.04",
            "cpe:/o:canonical:ubuntu_linux:20.04",
            Local::now(),
        );
        report
    }

    #[test]
    fn test_counts() {
        let report = build_sample();
        assert_eq!(report.result_count(), 2);
        assert_eq!(report.host_count(), 1);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_no_matches_still_builds_asset_block() {
        let mut vulns = BTreeMap::new();
        vulns.insert(String::from("cpe:/a:nginx:nginx:1.18.0"), BTreeMap::new());

        let mut report = Report::new();
        report.add_host_results(
            "10.0.0.9",
            "lb1",
            &vulns,
            "Debian GNU/Linux 11",
            "cpe:/o:debian:debian_linux:11",
            Local::now(),
        );
        assert_eq!(report.result_count(), 0);
        assert_eq!(report.host_count(), 1);
    }

    #[test]
    fn test_xml_is_well_formed_with_required_structure() {
        let report = build_sample();
        let xml = report.to_xml().unwrap();

        let mut reader = Reader::from_str(&xml);
        let mut buf = Vec::new();
        let mut result_elements = 0;
        let mut host_assets = 0;
        let mut saw_format_id = false;
        let mut saw_ports = false;
        let mut depth = 0usize;

        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) => {
                    depth += 1;
                    match e.name().as_ref() {
                        b"report" if depth == 1 => {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"format_id" {
                                    saw_format_id =
                                        attr.value.as_ref() == REPORT_FORMAT_ID.as_bytes();
                                }
                            }
                        }
                        b"result" => result_elements += 1,
                        // host asset blocks sit directly under the inner report
                        b"host" if depth == 3 => host_assets += 1,
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    if e.name().as_ref() == b"ports" {
                        saw_ports = true;
                    }
                }
                Event::End(_) => depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        assert!(saw_format_id);
        assert!(saw_ports);
        assert_eq!(result_elements, 2);
        assert_eq!(host_assets, 1);
    }

    #[test]
    fn test_result_carries_nvt_and_severity() {
        let xml = build_sample().to_xml().unwrap();
        assert!(xml.contains(r#"<nvt oid="CVE-2021-44228">"#));
        assert!(xml.contains("<cvss_base>10.0</cvss_base>"));
        assert!(xml.contains("<severity>9.0</severity>"));
        assert!(xml.contains("<type>cve</type>"));
    }

    #[test]
    fn test_host_details() {
        let xml = build_sample().to_xml().unwrap();
        assert!(xml.contains("<name>hostname</name><value>web1</value>"));
        assert!(xml.contains("<name>best_os_txt</name><value>Ubuntu 20.04</value>"));
        assert!(xml.contains("<name>App</name><value>cpe:/a:apache:log4j:2.14.1</value>"));
        assert!(xml.contains("<description>CVE Scanner</description>"));
    }

    #[test]
    fn test_fresh_reports_get_distinct_ids() {
        assert_ne!(Report::new().id(), Report::new().id());
    }
}
