//! Catalog synchronization from the server's SecInfo feed
//!
//! Builds the CSV lookup table by paging the server's CVE feed: one probe
//! request to learn the total, then fixed-size pages. Each CVE record
//! contributes one row per affected-product CPE. Also resolves version-less
//! CPEs to the versioned ones the server knows.

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use csv::{QuoteStyle, WriterBuilder};
use cveimport_core::{Error, Result};
use cveimport_gmp::{Gmp, InfoType};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info};

/// Pages the CVE feed into a CSV lookup table
pub struct CatalogSync<'a, G: Gmp + ?Sized> {
    gmp: &'a mut G,
    page_size: u64,
}

/// Counters from one sync run
#[derive(Debug, Default)]
pub struct SyncStats {
    /// CVEs the server reported in total
    pub total: u64,
    /// CVE records consumed
    pub cves_processed: u64,
    /// CSV rows written (one per product CPE)
    pub rows_written: u64,
}

impl<'a, G: Gmp + ?Sized> CatalogSync<'a, G> {
    pub fn new(gmp: &'a mut G) -> Self {
        Self {
            gmp,
            page_size: 1000,
        }
    }

    /// Rows per feed page
    pub fn page_size(mut self, rows: u64) -> Self {
        self.page_size = rows.max(1);
        self
    }

    /// Page the whole CVE feed into a CSV list at `path`
    pub fn run(mut self, path: impl AsRef<Path>) -> Result<SyncStats> {
        let start = Instant::now();
        let path = path.as_ref();
        let mut stats = SyncStats::default();

        let probe = self.gmp.get_info_list(InfoType::Cve, "rows=1")?;
        probe.require_success()?;
        let total = parse_info_page(probe.body())?.info_count.ok_or_else(|| {
            Error::GmpResponse(String::from("CVE feed response carried no info_count"))
        })?;
        info!("server reports {} CVEs", total);
        stats.total = total;

        let file = File::create(path)?;
        let mut writer = WriterBuilder::new()
            .quote(b'\'')
            .quote_style(QuoteStyle::Always)
            .from_writer(file);

        let mut first = 0u64;
        while first < total {
            let rows = self.page_size.min(total - first);
            let resp = self
                .gmp
                .get_info_list(InfoType::Cve, &format!("rows={} first={}", rows, first))?;
            resp.require_success()?;

            let page = parse_info_page(resp.body())?;
            for record in &page.records {
                for product in &record.products {
                    writer.write_record([
                        product.as_str(),
                        record.cve.as_str(),
                        record.cvss.as_str(),
                    ])?;
                    stats.rows_written += 1;
                }
                stats.cves_processed += 1;
            }

            first += rows;
            info!(
                "synced {}/{} CVEs in {:?}",
                first.min(total),
                total,
                start.elapsed()
            );
        }
        writer.flush()?;

        info!(
            "catalog sync complete: {} rows from {} CVEs",
            stats.rows_written, stats.cves_processed
        );
        Ok(stats)
    }
}

/// Resolve a version-less CPE v2.2 URI to the versioned CPEs the server
/// knows under that prefix
pub fn expand_unversioned<G: Gmp + ?Sized>(gmp: &mut G, uri: &str) -> Result<Vec<String>> {
    let start = Instant::now();
    let filter = format!("rows=-1 uuid~\"{}:\"", uri);
    let resp = gmp.get_info_list(InfoType::Cpe, &filter)?;
    resp.require_success()?;
    let ids = parse_info_ids(resp.body())?;
    debug!(
        "expanded {} to {} versioned CPEs in {:?}",
        uri,
        ids.len(),
        start.elapsed()
    );
    Ok(ids)
}

/// One CVE record from a feed page
#[derive(Debug, Clone, PartialEq)]
pub struct CveRecord {
    pub cve: String,
    /// CVSS score kept verbatim as the feed sent it
    pub cvss: String,
    /// Affected-product CPEs
    pub products: Vec<String>,
}

/// A decoded get_info page over the CVE class
#[derive(Debug, Default)]
pub struct FeedPage {
    pub records: Vec<CveRecord>,
    /// Total reported by the feed, when the response carries one
    pub info_count: Option<u64>,
}

/// Walk a get_info response for CVE records
///
/// Only `info` elements with an `id` attribute and a `cve` child count; the
/// trailing pagination echo element carries neither. Records without
/// products are dropped, matching what a row-per-product table can hold.
pub fn parse_info_page(xml: &str) -> Result<FeedPage> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut page = FeedPage::default();
    let mut buf = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_element = String::new();
    let mut in_cve = false;
    let mut cvss = String::new();
    let mut products = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match current_element.as_str() {
                    "info" => {
                        current_id = element_id(&e);
                        in_cve = false;
                        cvss.clear();
                        products.clear();
                    }
                    "cve" if current_id.is_some() => in_cve = true,
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"info" {
                    if let Some(id) = current_id.take() {
                        if in_cve && !products.trim().is_empty() {
                            page.records.push(CveRecord {
                                cve: id,
                                cvss: cvss.clone(),
                                products: products.split_whitespace().map(String::from).collect(),
                            });
                        }
                    }
                    in_cve = false;
                }
                current_element.clear();
            }
            Event::Text(e) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "cvss" if in_cve => cvss = text,
                    "products" if in_cve => products = text,
                    "info_count" => page.info_count = text.trim().parse().ok(),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}

/// Collect the `id` attributes of every `info` element
pub fn parse_info_ids(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.name().as_ref() == b"info" {
                    if let Some(id) = element_id(&e) {
                        ids.push(id);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(ids)
}

fn element_id(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() == b"id" {
            Some(String::from_utf8_lossy(&attr.value).into_owned())
        } else {
            None
        }
    })
}
