//! # Configuration
//!
//! Every option can be given as a flag or through the environment, which is
//! how scheduled cleanup jobs drive the tool. Arguments are validated once
//! into a [`PruneConfig`] that the rest of the crate borrows.

use crate::error::PruneError;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use clap::Args;
use url::Url;

use std::fmt;

/// Arguments for `conda-prune`.
#[derive(Args)]
pub struct PruneArgs {
    /// anaconda.org token with write access to the channel
    #[arg(long, env = "CONDA_TOKEN", hide_env_values = true)]
    token: String,

    /// Only remove builds older than this many days
    #[arg(long, env = "DAYS_OLD", default_value_t = 10)]
    days_old: u64,

    /// Channel to clean up
    #[arg(long, env = "CHANNEL", default_value = "rapidsai-nightly")]
    channel: String,

    /// Comma separated package names
    #[arg(long, env = "PACKAGES", value_delimiter = ',', required = true)]
    packages: Vec<String>,

    /// Always keep this many of the newest builds of each package
    #[arg(long = "keep", env = "KEEP_NUM_PACKAGES", default_value_t = 21)]
    keep_num_packages: usize,

    /// Host serving the channel's repodata
    #[arg(
        long,
        env = "CONDA_CHANNEL_URL",
        default_value = "https://conda.anaconda.org"
    )]
    channel_url: Url,

    /// anaconda.org API used for removal
    #[arg(
        long,
        env = "CONDA_API_URL",
        default_value = "https://api.anaconda.org"
    )]
    api_url: Url,
}

/// Validated settings for one run.
#[derive(Clone)]
pub struct PruneConfig {
    pub token: String,
    pub days_old: u64,
    pub channel: String,
    pub packages: Vec<String>,
    pub keep_num_packages: usize,
    pub channel_url: Url,
    pub api_url: Url,
}

impl PruneConfig {
    /// Builds are eligible for removal when dated strictly before this.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(self.days_old))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl TryFrom<PruneArgs> for PruneConfig {
    type Error = anyhow::Error;

    fn try_from(args: PruneArgs) -> Result<Self> {
        let packages: Vec<String> = args
            .packages
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        if packages.is_empty() {
            return Err(PruneError::NoPackages.into());
        }

        Ok(PruneConfig {
            token: args.token,
            days_old: args.days_old,
            channel: args.channel,
            packages,
            keep_num_packages: args.keep_num_packages,
            channel_url: args.channel_url,
            api_url: args.api_url,
        })
    }
}

impl fmt::Debug for PruneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PruneConfig")
            .field("token", &"<redacted>")
            .field("days_old", &self.days_old)
            .field("channel", &self.channel)
            .field("packages", &self.packages)
            .field("keep_num_packages", &self.keep_num_packages)
            .field("channel_url", &self.channel_url.as_str())
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PruneArgs,
    }

    fn parse(argv: &[&str]) -> Result<PruneConfig> {
        let argv = std::iter::once("conda-prune").chain(argv.iter().copied());
        let cli = TestCli::try_parse_from(argv)?;
        PruneConfig::try_from(cli.args)
    }

    #[test]
    fn defaults_match_nightly_channel_policy() {
        let config = parse(&["--token", "t", "--packages", "cudf"]).unwrap();

        assert_eq!(config.days_old, 10);
        assert_eq!(config.channel, "rapidsai-nightly");
        assert_eq!(config.keep_num_packages, 21);
        assert_eq!(config.channel_url.as_str(), "https://conda.anaconda.org/");
        assert_eq!(config.api_url.as_str(), "https://api.anaconda.org/");
    }

    #[test]
    fn packages_are_split_and_trimmed_in_order() {
        let config = parse(&["--token", "t", "--packages", "cudf, cuml,,rmm "]).unwrap();
        assert_eq!(config.packages, vec!["cudf", "cuml", "rmm"]);
    }

    #[test]
    fn blank_package_list_is_rejected() {
        let err = parse(&["--token", "t", "--packages", " , "]).unwrap_err();
        assert!(matches!(err.downcast_ref::<PruneError>(), Some(PruneError::NoPackages)));
    }

    #[test]
    fn non_numeric_days_is_rejected() {
        assert!(parse(&["--token", "t", "--packages", "cudf", "--days-old", "ten"]).is_err());
    }

    #[test]
    fn debug_output_hides_token() {
        let config = parse(&["--token", "secret-token", "--packages", "cudf"]).unwrap();
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[test]
    fn cutoff_subtracts_days() {
        let config = parse(&["--token", "t", "--packages", "cudf", "--days-old", "10"]).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(config.cutoff(today), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
