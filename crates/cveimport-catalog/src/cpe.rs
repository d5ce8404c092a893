//! CPE (Common Platform Enumeration) identifiers
//!
//! Parses both CPE v2.3 formatted strings (`cpe:2.3:part:vendor:...`) and
//! v2.2 URIs (`cpe:/part:vendor:...`) and converts between the two forms.
//! The v2.2 URI form is what the lookup table and the server's SecInfo feed
//! carry, so the v2.3 to v2.2 conversion is the one the import pipeline
//! leans on.

use std::fmt;
use std::str::FromStr;

use cveimport_core::Error;

/// A CPE identifier, component-wise
///
/// v2.3 component order: part:vendor:product:version:update:edition:
/// language:sw_edition:target_sw:target_hw:other. A v2.2 URI carries only
/// the first seven; the rest default to ANY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpe {
    /// Part: 'a' (application), 'o' (OS), 'h' (hardware)
    pub part: CpePart,
    pub vendor: String,
    pub product: String,
    pub version: String,
    pub update: String,
    pub edition: String,
    pub language: String,
    pub sw_edition: String,
    pub target_sw: String,
    pub target_hw: String,
    pub other: String,
}

/// CPE part type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CpePart {
    Application,
    OperatingSystem,
    Hardware,
    #[default]
    Any,
}

impl fmt::Display for CpePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpePart::Application => write!(f, "a"),
            CpePart::OperatingSystem => write!(f, "o"),
            CpePart::Hardware => write!(f, "h"),
            CpePart::Any => write!(f, "*"),
        }
    }
}

impl FromStr for CpePart {
    type Err = CpeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(CpePart::Application),
            "o" => Ok(CpePart::OperatingSystem),
            "h" => Ok(CpePart::Hardware),
            "*" | "" => Ok(CpePart::Any),
            _ => Err(CpeParseError::InvalidPart(s.to_string())),
        }
    }
}

impl Cpe {
    /// Parse a CPE in either the v2.3 formatted or the v2.2 URI notation
    pub fn parse(s: &str) -> Result<Self, CpeParseError> {
        if let Some(rest) = s.strip_prefix("cpe:2.3:") {
            Self::parse_formatted(rest)
        } else if let Some(rest) = s.strip_prefix("cpe:/") {
            Self::parse_uri(rest)
        } else {
            Err(CpeParseError::InvalidPrefix)
        }
    }

    fn parse_formatted(rest: &str) -> Result<Self, CpeParseError> {
        let fields: Vec<&str> = rest.split(':').collect();
        if fields.len() < 3 {
            return Err(CpeParseError::TooFewComponents);
        }

        let part = fields[0].parse()?;
        let component = |index: usize| -> String {
            fields
                .get(index)
                .map(|f| unescape_formatted(f))
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| String::from("*"))
        };

        Ok(Self {
            part,
            vendor: component(1),
            product: component(2),
            version: component(3),
            update: component(4),
            edition: component(5),
            language: component(6),
            sw_edition: component(7),
            target_sw: component(8),
            target_hw: component(9),
            other: component(10),
        })
    }

    fn parse_uri(rest: &str) -> Result<Self, CpeParseError> {
        let fields: Vec<&str> = rest.split(':').collect();
        if fields[0].is_empty() {
            return Err(CpeParseError::TooFewComponents);
        }

        let part = fields[0].parse()?;
        let component = |index: usize| -> String {
            fields
                .get(index)
                .map(|f| decode_uri(f))
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| String::from("*"))
        };

        Ok(Self {
            part,
            vendor: component(1),
            product: component(2),
            version: component(3),
            update: component(4),
            edition: component(5),
            language: component(6),
            sw_edition: String::from("*"),
            target_sw: String::from("*"),
            target_hw: String::from("*"),
            other: String::from("*"),
        })
    }

    /// Format as a CPE v2.3 formatted string
    pub fn to_cpe_string(&self) -> String {
        format!(
            "cpe:2.3:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.part,
            self.vendor,
            self.product,
            self.version,
            self.update,
            self.edition,
            self.language,
            self.sw_edition,
            self.target_sw,
            self.target_hw,
            self.other
        )
    }

    /// Format as a CPE v2.2 URI, trailing ANY components omitted
    pub fn to_uri_22(&self) -> String {
        let tail = [
            &self.vendor,
            &self.product,
            &self.version,
            &self.update,
            &self.edition,
            &self.language,
        ];
        let mut components: Vec<String> = tail.iter().map(|c| encode_uri(c)).collect();
        while components.last().map_or(false, |c| c.is_empty()) {
            components.pop();
        }

        let mut uri = format!("cpe:/{}", self.part);
        for component in &components {
            uri.push(':');
            uri.push_str(component);
        }
        uri
    }

    /// Whether the version component is concrete rather than ANY
    pub fn has_version(&self) -> bool {
        self.version != "*" && !self.version.is_empty()
    }

    /// Get a simplified identifier for this CPE (vendor:product)
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.vendor, self.product)
    }
}

impl fmt::Display for Cpe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cpe_string())
    }
}

impl FromStr for Cpe {
    type Err = CpeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cpe::parse(s)
    }
}

/// Remove the backslash escapes of the v2.3 formatted notation
fn unescape_formatted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Percent-decode a v2.2 URI component
fn decode_uri(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push((high * 16 + low) as char);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Percent-encode a component for the v2.2 URI notation; ANY becomes the
/// empty component
fn encode_uri(component: &str) -> String {
    if component == "*" {
        return String::new();
    }
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '~') {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push('%');
                out.push(char::from_digit(u32::from(b >> 4), 16).unwrap_or('0'));
                out.push(char::from_digit(u32::from(b & 0xf), 16).unwrap_or('0'));
            }
        }
    }
    out
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// CPE parsing error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpeParseError {
    InvalidPrefix,
    TooFewComponents,
    InvalidPart(String),
}

impl fmt::Display for CpeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpeParseError::InvalidPrefix => write!(f, "CPE must start with 'cpe:2.3:' or 'cpe:/'"),
            CpeParseError::TooFewComponents => write!(f, "CPE has too few components"),
            CpeParseError::InvalidPart(p) => write!(f, "invalid CPE part: {}", p),
        }
    }
}

impl std::error::Error for CpeParseError {}

impl From<CpeParseError> for Error {
    fn from(e: CpeParseError) -> Self {
        Error::InvalidCpe(e.to_string())
    }
}
