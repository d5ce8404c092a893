//! Error types for the cveimport workspace
//!
//! Every input error is fatal: it propagates to the binary's `main`, gets
//! logged, and terminates the process. Nothing is retried.

use thiserror::Error;

/// Result type alias using the cveimport Error
pub type Result<T> = std::result::Result<T, Error>;

/// cveimport error types
#[derive(Error, Debug)]
pub enum Error {
    // === Lookup table ===
    #[error(
        "there is no lookup list at \"{path}\"; run with --create-list --list {path} \
         to create one, or pass the location of an existing list"
    )]
    MissingListFile { path: String },

    // === Host dump ===
    #[error("malformed host dump: {0}")]
    MalformedDump(String),

    // === CPE handling ===
    #[error("invalid CPE: {0}")]
    InvalidCpe(String),

    // === GMP protocol ===
    #[error("GMP command failed ({status}): {message}")]
    Gmp { status: String, message: String },

    #[error("GMP connection closed by server")]
    GmpClosed,

    #[error("malformed GMP response: {0}")]
    GmpResponse(String),

    // === Configuration ===
    #[error("configuration error: {0}")]
    Configuration(String),

    // === IO / format conversions ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid UTF-8 in response: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingListFile { .. } => "MISSING_LIST",
            Error::MalformedDump(_) => "MALFORMED_DUMP",
            Error::InvalidCpe(_) => "INVALID_CPE",
            Error::Gmp { .. } => "GMP_STATUS",
            Error::GmpClosed => "GMP_CLOSED",
            Error::GmpResponse(_) => "GMP_RESPONSE",
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Csv(_) => "CSV_ERROR",
            Error::Xml(_) => "XML_ERROR",
            Error::Utf8(_) => "UTF8_ERROR",
        }
    }
}
