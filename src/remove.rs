//! # Removal
//!
//! Deletes package files from anaconda.org in fixed-size chunks. Each chunk
//! is one call to a [`PackageRemover`]; a failing chunk stops everything
//! after it, while chunks already sent stay removed.

use crate::config::PruneConfig;
use crate::error::PruneError;
use crate::record::VersionRecord;

use anyhow::{Context, Result};
use colored::Colorize;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{debug, info, warn};
use url::Url;

use std::fmt;
use std::time::Duration;

/// Maximum number of files per removal call.
pub const CHUNK_SIZE: usize = 50;

/// A single file on the channel, `channel/package/version/subdir/filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveSpec {
    pub channel: String,
    pub package: String,
    pub version: String,
    /// `subdir/filename`
    pub basename: String,
}

impl RemoveSpec {
    pub fn new(channel: &str, package: &str, record: &VersionRecord) -> Self {
        RemoveSpec {
            channel: channel.to_string(),
            package: package.to_string(),
            version: record.version.clone(),
            basename: record.relative_path.clone(),
        }
    }
}

impl fmt::Display for RemoveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.channel, self.package, self.version, self.basename)
    }
}

/// A trait for deleting files from a channel.
pub trait PackageRemover {
    /// Remove every file in `specs`, without asking for confirmation.
    fn remove(&self, specs: &[RemoveSpec]) -> Result<()>;
}

/// Remove `records` of `package` in chunks of [`CHUNK_SIZE`], reporting
/// progress after each chunk. Returns the number of files removed.
///
/// # Errors
/// The first error from `remover` is returned as is; later chunks are not
/// attempted.
pub fn remove_in_chunks<R: PackageRemover + ?Sized>(
    remover: &R,
    channel: &str,
    package: &str,
    records: &[VersionRecord],
) -> Result<usize> {
    let total = records.len();
    let mut count = 0;

    for chunk in records.chunks(CHUNK_SIZE) {
        let specs: Vec<RemoveSpec> = chunk
            .iter()
            .map(|record| RemoveSpec::new(channel, package, record))
            .collect();

        remover.remove(&specs)?;

        count += chunk.len();
        info!(package, count, total, "removed chunk");
        println!(
            "{} {}",
            "✓".green().bold(),
            format!("Removed {count}/{total} {package} packages...").green()
        );
    }

    Ok(count)
}

/// Removes files through the anaconda.org REST API.
pub struct AnacondaRemover {
    client: Client,
    api_url: Url,
    token: String,
}

impl AnacondaRemover {
    pub fn new(config: &PruneConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("Failed to build client")?;

        Ok(AnacondaRemover {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        })
    }

    /// `{api}/dist/{channel}/{package}/{version}/{subdir}/{filename}`
    fn dist_url(&self, spec: &RemoveSpec) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base: {}", self.api_url))?
            .pop_if_empty()
            .extend([
                "dist",
                spec.channel.as_str(),
                spec.package.as_str(),
                spec.version.as_str(),
            ])
            .extend(spec.basename.split('/'));
        Ok(url)
    }
}

impl PackageRemover for AnacondaRemover {
    fn remove(&self, specs: &[RemoveSpec]) -> Result<()> {
        let mut auth = HeaderValue::from_str(&format!("token {}", self.token))
            .context("Token is not a valid header value")?;
        auth.set_sensitive(true);

        for spec in specs {
            let url = self.dist_url(spec)?;
            debug!(url = %url, "removing file");

            let response = self
                .client
                .delete(url.clone())
                .header(AUTHORIZATION, auth.clone())
                .send()
                .with_context(|| format!("Failed to send removal request for {spec}"))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                // Already gone; forced removal carries on.
                warn!(spec = %spec, "file not found on channel, skipping");
                continue;
            }
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(PruneError::RemoveFailed {
                    spec: spec.to_string(),
                    status: format!("{status} {}", body.trim()).trim_end().to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
