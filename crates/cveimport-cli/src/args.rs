//! Command-line arguments
//!
//! The historical interface used `+`/`++` flag prefixes because the
//! launcher reserved `-` flags for itself. Both those spellings and the
//! conventional `-`/`--` forms are accepted: leading `+` runs are rewritten
//! before clap sees them.

use std::path::PathBuf;

use clap::Parser;

/// Create a CVE report from a JSON host dump and import it over GMP
#[derive(Parser, Debug)]
#[command(name = "cveimport")]
#[command(version)]
#[command(about = "Create a CVE report from a JSON host dump and import it into a GVM server")]
pub struct Args {
    /// Build or refresh the CPE to CVE lookup list from the server feed
    #[arg(long)]
    pub create_list: bool,

    /// Path of the CPE to CVE lookup list
    #[arg(short, long)]
    pub list: Option<PathBuf>,

    /// JSON host dump to import
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, default_value = "/etc/cveimport/config.toml")]
    pub config: PathBuf,

    /// gvmd Unix socket path (overrides the configuration file)
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long)]
    pub log_format: Option<String>,
}

impl Args {
    /// Parse process arguments, accepting the `+`-prefixed spellings
    pub fn parse_with_plus_prefixes() -> Self {
        Self::parse_from(normalize_prefixes(std::env::args()))
    }
}

/// Rewrite `+f`/`++flag` spellings to the `-f`/`--flag` forms clap expects
pub fn normalize_prefixes<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            if let Some(rest) = arg.strip_prefix("++") {
                format!("--{}", rest)
            } else if let Some(rest) = arg.strip_prefix('+') {
                format!("-{}", rest)
            } else {
                arg
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_prefixes() {
        assert_eq!(
            normalize_prefixes(args(&["cveimport", "++create-list", "+f", "dump.json"])),
            args(&["cveimport", "--create-list", "-f", "dump.json"])
        );
    }

    #[test]
    fn test_values_are_left_alone() {
        assert_eq!(
            normalize_prefixes(args(&["cveimport", "-l", "cpes.csv"])),
            args(&["cveimport", "-l", "cpes.csv"])
        );
    }

    #[test]
    fn test_plus_spelling_parses() {
        let parsed = Args::try_parse_from(normalize_prefixes(args(&[
            "cveimport",
            "++create-list",
            "+l",
            "cpes.csv",
            "+f",
            "dump.json",
        ])))
        .unwrap();
        assert!(parsed.create_list);
        assert_eq!(parsed.list.as_deref(), Some(std::path::Path::new("cpes.csv")));
        assert_eq!(parsed.file.as_deref(), Some(std::path::Path::new("dump.json")));
    }

    #[test]
    fn test_conventional_spelling_parses() {
        let parsed =
            Args::try_parse_from(args(&["cveimport", "--file", "dump.json"])).unwrap();
        assert!(!parsed.create_list);
        assert_eq!(parsed.file.as_deref(), Some(std::path::Path::new("dump.json")));
    }
}
