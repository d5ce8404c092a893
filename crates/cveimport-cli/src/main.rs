//! cveimport - create a CVE report from a JSON host dump and import it
//! into a GVM server over GMP
//!
//! Two modes, combinable in one invocation:
//! - `++create-list` pages the server's CVE feed into the CSV lookup list
//! - `+f <dump.json>` resolves the dump's CPEs against the list and imports
//!   the resulting report

mod args;
mod pipeline;

use std::time::Duration;

use anyhow::{Context, Result};
use args::Args;
use cveimport_common::logging::{self, LogFormat};
use cveimport_common::Config;
use cveimport_gmp::GmpClient;
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse_with_plus_prefixes();

    let config = if args.config.exists() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };
    let config = config.merge_env();

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let format: LogFormat = args
        .log_format
        .as_deref()
        .unwrap_or(&config.logging.format)
        .parse()
        .unwrap_or_default();
    logging::init(level, format);

    info!("cveimport {}", env!("CARGO_PKG_VERSION"));

    if !args.create_list && args.file.is_none() {
        anyhow::bail!("nothing to do: pass ++create-list and/or +f <dump.json>");
    }

    let socket = args
        .socket
        .clone()
        .unwrap_or_else(|| config.gmp.socket_path.clone().into());
    let read_timeout = (config.gmp.read_timeout_seconds > 0)
        .then(|| Duration::from_secs(config.gmp.read_timeout_seconds));

    let mut gmp = GmpClient::connect_unix(&socket, read_timeout)
        .with_context(|| format!("connecting to gvmd at {}", socket.display()))?;
    if let (Some(username), Some(password)) = (&config.gmp.username, &config.gmp.password) {
        gmp.authenticate(username, password)?;
    }

    let list_path = args
        .list
        .clone()
        .unwrap_or_else(|| config.catalog.list_path.clone().into());

    if args.create_list {
        pipeline::create_list(&mut gmp, &list_path, config.catalog.page_size)?;
    }

    if let Some(dump) = &args.file {
        let report_id = pipeline::import_dump(&mut gmp, dump, &list_path)
            .with_context(|| format!("importing {}", dump.display()))?;
        println!("{}", report_id);
    }

    Ok(())
}
