//! GMP message types: SecInfo classes and the response envelope

use std::fmt;

use cveimport_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// SecInfo class selector for get_info queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoType {
    Cve,
    Cpe,
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::Cve => "CVE",
            InfoType::Cpe => "CPE",
        }
    }
}

impl fmt::Display for InfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decoded GMP response envelope
///
/// Every GMP response is a single element whose root carries `status` and
/// `status_text` attributes; the body is kept verbatim for callers that
/// walk the payload.
#[derive(Debug, Clone)]
pub struct GmpResponse {
    status: String,
    status_text: String,
    body: String,
}

impl GmpResponse {
    /// Decode a raw response document
    pub fn parse(raw: String) -> Result<Self> {
        let (status, status_text) = root_status(&raw)?;
        Ok(Self {
            status,
            status_text,
            body: raw,
        })
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// The full response document
    pub fn body(&self) -> &str {
        &self.body
    }

    /// GMP uses HTTP-like status codes; 2xx is success
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }

    /// Turn a non-2xx status into an error carrying status and text
    pub fn require_success(&self) -> Result<&Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Gmp {
                status: self.status.clone(),
                message: self.status_text.clone(),
            })
        }
    }

    /// First `id` attribute anywhere in the document; create_task and
    /// create_report responses carry the new resource id this way
    pub fn first_id(&self) -> Option<String> {
        first_attr(&self.body, b"id")
    }
}

/// Extract status/status_text from the response's root element
fn root_status(xml: &str) -> Result<(String, String)> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let mut status = None;
                let mut status_text = String::new();
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                    match attr.key.as_ref() {
                        b"status" => status = Some(value),
                        b"status_text" => status_text = value,
                        _ => {}
                    }
                }
                let status = status.ok_or_else(|| {
                    Error::GmpResponse(String::from("response root has no status attribute"))
                })?;
                return Ok((status, status_text));
            }
            Event::Eof => {
                return Err(Error::GmpResponse(String::from("empty response document")))
            }
            _ => {}
        }
        buf.clear();
    }
}

fn first_attr(xml: &str, name: &[u8]) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == name {
                        return Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
