//! # Package search
//!
//! Lists the files a channel holds for a package. The channel is queried one
//! architecture subdirectory at a time, in the order of [`ARCHES`], and the
//! first subdirectory that knows the package wins.
//!
//! [`RepodataSearch`] reads the same `repodata.json` index that
//! `conda search` does, so no conda installation is needed on the host.

use crate::config::PruneConfig;
use crate::error::PruneError;
use crate::record::VersionRecord;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use std::collections::HashMap;
use std::time::Duration;

/// Architecture subdirectories, in the order they are tried.
pub const ARCHES: [&str; 2] = ["noarch", "linux-64"];

/// Repodata timestamps below this are in seconds, not milliseconds
/// (9999-12-31T23:59:59Z as seconds).
const MAX_SECONDS_TIMESTAMP: i64 = 253_402_300_799;

/// A single file of a package in one subdirectory.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFile {
    pub version: String,
    /// Upload time in milliseconds since the epoch.
    pub timestamp: i64,
    pub subdir: String,
    pub file_name: String,
}

/// Outcome of looking a package up in one subdirectory.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Vec<PackageFile>),
    NotFound,
}

/// A trait for querying a channel's package index.
pub trait PackageSearch {
    /// Look up every file of `package` in `channel/subdir`.
    ///
    /// # Errors
    /// Returns an error only when the service itself fails. A package that
    /// is simply absent from the subdirectory is [`Lookup::NotFound`]; an
    /// empty [`Lookup::Found`] is treated the same way.
    fn search(&self, channel: &str, package: &str, subdir: &str) -> Result<Lookup>;
}

/// Get all versions of `package` from the first subdirectory that has any.
///
/// # Errors
/// [`PruneError::PackageNotFound`] when no subdirectory has the package, or
/// the search service's own error.
pub fn list_versions<S: PackageSearch + ?Sized>(
    search: &S,
    channel: &str,
    package: &str,
) -> Result<Vec<VersionRecord>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    for arch in ARCHES {
        spinner.set_message(format!(
            "{} {}",
            "Searching".cyan().bold(),
            format!("{channel}/{arch}::{package}").bold()
        ));

        let lookup = search
            .search(channel, package, arch)
            .inspect_err(|_| spinner.finish_and_clear())
            .with_context(|| format!("Failed to search {channel}/{arch} for {package}"))?;

        match lookup {
            Lookup::Found(files) if !files.is_empty() => {
                spinner.finish_and_clear();
                info!(package, arch, files = files.len(), "found package");
                let records = files
                    .iter()
                    .map(|f| VersionRecord::new(&f.version, f.timestamp, &f.subdir, &f.file_name))
                    .collect();
                return Ok(records);
            }
            Lookup::Found(_) | Lookup::NotFound => {
                debug!(package, arch, "not in subdir, trying next");
                continue;
            }
        }
    }

    spinner.finish_and_clear();
    Err(PruneError::PackageNotFound {
        package: package.to_string(),
        channel: channel.to_string(),
    }
    .into())
}

/// One entry of `repodata.json`. The filename is the map key.
#[derive(Debug, Deserialize)]
struct RepodataEntry {
    name: String,
    version: String,
    #[serde(default)]
    subdir: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Repodata {
    #[serde(default)]
    packages: HashMap<String, RepodataEntry>,
    #[serde(default, rename = "packages.conda")]
    packages_conda: HashMap<String, RepodataEntry>,
}

impl Repodata {
    /// Files named `package`, sorted by filename.
    fn files_for(self, package: &str, subdir: &str) -> Vec<PackageFile> {
        let mut files: Vec<PackageFile> = self
            .packages
            .into_iter()
            .chain(self.packages_conda)
            .filter(|(_, entry)| entry.name == package)
            .map(|(file_name, entry)| PackageFile {
                version: entry.version,
                timestamp: normalize_timestamp(entry.timestamp.unwrap_or(0)),
                subdir: entry.subdir.unwrap_or_else(|| subdir.to_string()),
                file_name,
            })
            .collect();
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        files
    }
}

/// Older repodata records upload times in seconds; scale those to
/// milliseconds like `conda search` reports them.
fn normalize_timestamp(ts: i64) -> i64 {
    if ts > 0 && ts < MAX_SECONDS_TIMESTAMP {
        ts * 1000
    } else {
        ts
    }
}

/// Searches a channel through its `repodata.json` files.
pub struct RepodataSearch {
    client: Client,
    base_url: Url,
}

impl RepodataSearch {
    /// Create a search client against a conda channel host such as
    /// `https://conda.anaconda.org`.
    pub fn new(config: &PruneConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("Failed to build client")?;

        Ok(RepodataSearch {
            client,
            base_url: config.channel_url.clone(),
        })
    }

    fn repodata_url(&self, channel: &str, subdir: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Channel URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend([channel, subdir, "repodata.json"]);
        Ok(url)
    }
}

impl PackageSearch for RepodataSearch {
    fn search(&self, channel: &str, package: &str, subdir: &str) -> Result<Lookup> {
        let url = self.repodata_url(channel, subdir)?;
        debug!(url = %url, "fetching repodata");

        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("Failed to send request for {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }

        let repodata: Repodata = response
            .error_for_status()
            .with_context(|| format!("Bad response for {url}"))?
            .json()
            .with_context(|| format!("Failed to parse repodata from {url}"))?;

        let files = repodata.files_for(package, subdir);
        if files.is_empty() {
            Ok(Lookup::NotFound)
        } else {
            Ok(Lookup::Found(files))
        }
    }
}
