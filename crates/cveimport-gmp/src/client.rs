//! Blocking GMP client over a byte-stream transport

use std::io::{Read, Write};

use cveimport_core::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info};

use crate::types::{GmpResponse, InfoType};

/// Operations the import pipeline needs from a management server
pub trait Gmp {
    /// Run a get_info query over a SecInfo class
    fn get_info_list(&mut self, info_type: InfoType, filter: &str) -> Result<GmpResponse>;

    /// Create a container task to attach an imported report to; returns the
    /// new task id
    fn create_container_task(&mut self, name: &str, comment: &str) -> Result<String>;

    /// Import a report document into a container task; returns the new
    /// report id
    fn import_report(&mut self, report: &str, task_id: &str, in_assets: bool) -> Result<String>;
}

/// GMP client speaking XML commands over a blocking byte stream
///
/// Commands are single XML elements; a response is complete once its root
/// element closes. The stream is used strictly request/response, one
/// command at a time.
pub struct GmpClient<S: Read + Write> {
    stream: S,
}

impl<S: Read + Write> GmpClient<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Authenticate the connection; gvmd requires this before any other
    /// command
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let command = format!(
            "<authenticate><credentials><username>{}</username>\
             <password>{}</password></credentials></authenticate>",
            escape(username),
            escape(password)
        );
        self.transact(&command)?.require_success()?;
        debug!("authenticated as {}", username);
        Ok(())
    }

    /// Give the underlying stream back
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn transact(&mut self, command: &str) -> Result<GmpResponse> {
        self.stream.write_all(command.as_bytes())?;
        self.stream.flush()?;
        let raw = self.read_document()?;
        GmpResponse::parse(raw)
    }

    /// Read from the stream until the response's root element is closed
    fn read_document(&mut self) -> Result<String> {
        let mut collected = Vec::new();
        let mut chunk = [0u8; 16 * 1024];
        loop {
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                if collected.is_empty() {
                    return Err(Error::GmpClosed);
                }
                break;
            }
            collected.extend_from_slice(&chunk[..n]);
            if document_complete(&collected) {
                break;
            }
        }
        Ok(String::from_utf8(collected)?)
    }
}

#[cfg(unix)]
impl GmpClient<std::os::unix::net::UnixStream> {
    /// Connect to a gvmd Unix domain socket
    pub fn connect_unix(
        path: impl AsRef<std::path::Path>,
        read_timeout: Option<std::time::Duration>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let stream = std::os::unix::net::UnixStream::connect(path)?;
        stream.set_read_timeout(read_timeout)?;
        info!("connected to gvmd at {}", path.display());
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> Gmp for GmpClient<S> {
    fn get_info_list(&mut self, info_type: InfoType, filter: &str) -> Result<GmpResponse> {
        debug!("get_info type={} filter={}", info_type, filter);
        let command = format!(
            "<get_info type=\"{}\" filter=\"{}\"/>",
            info_type.as_str(),
            escape(filter)
        );
        self.transact(&command)
    }

    fn create_container_task(&mut self, name: &str, comment: &str) -> Result<String> {
        let command = format!(
            "<create_task><name>{}</name><comment>{}</comment>\
             <target id=\"0\"/></create_task>",
            escape(name),
            escape(comment)
        );
        let resp = self.transact(&command)?;
        resp.require_success()?;
        resp.first_id().ok_or_else(|| {
            Error::GmpResponse(String::from("create_task response carried no id"))
        })
    }

    fn import_report(&mut self, report: &str, task_id: &str, in_assets: bool) -> Result<String> {
        let command = format!(
            "<create_report><task id=\"{}\"/><in_assets>{}</in_assets>{}</create_report>",
            escape(task_id),
            u8::from(in_assets),
            report
        );
        let resp = self.transact(&command)?;
        resp.require_success()?;
        resp.first_id().ok_or_else(|| {
            Error::GmpResponse(String::from("create_report response carried no id"))
        })
    }
}

/// True once `bytes` holds one complete XML element tree
fn document_complete(bytes: &[u8]) -> bool {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                if depth <= 1 {
                    return depth == 1;
                }
                depth -= 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    return true;
                }
            }
            Ok(Event::Eof) => return false,
            Err(_) => return false,
            _ => {}
        }
        buf.clear();
    }
}
