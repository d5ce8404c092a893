//! Host records extracted from a JSON host dump

use serde::{Deserialize, Serialize};

/// One host entry from a dump, with multi-valued fields normalized to lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Host name as reported by the dump
    pub name: String,

    /// All addresses the host was seen under
    pub ips: Vec<String>,

    /// Address range the host was discovered in, if any
    pub ip_range: Option<String>,

    /// Operating system text
    pub os: String,

    /// Operating system CPE, as found in the dump
    pub os_cpe: String,

    /// CPEs of applications detected on the host
    #[serde(default)]
    pub cpes: Vec<String>,
}

impl HostRecord {
    /// Whether any application CPEs were reported for this host
    pub fn has_cpes(&self) -> bool {
        !self.cpes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_cpes() {
        let mut host = HostRecord {
            name: String::from("db1"),
            ips: vec![String::from("10.0.0.5")],
            ip_range: None,
            os: String::from("Debian GNU/Linux 11"),
            os_cpe: String::from("cpe:/o:debian:debian_linux:11"),
            cpes: Vec::new(),
        };
        assert!(!host.has_cpes());

        host.cpes.push(String::from("cpe:/a:postgresql:postgresql:13.4"));
        assert!(host.has_cpes());
    }
}
