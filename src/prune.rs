use crate::config::PruneConfig;
use crate::record::VersionRecord;
use crate::remove::{PackageRemover, remove_in_chunks};
use crate::retention::select_for_removal;
use crate::search::{PackageSearch, list_versions};

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use tracing::info;

/// What happened to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneSummary {
    pub package: String,
    pub found: usize,
    pub removed: usize,
}

/// Prune every configured package in order, stopping at the first failure.
///
/// Removals already made for earlier packages or chunks are not undone.
pub fn run<S, R>(
    config: &PruneConfig,
    search: &S,
    remover: &R,
    today: NaiveDate,
) -> Result<Vec<PruneSummary>>
where
    S: PackageSearch + ?Sized,
    R: PackageRemover + ?Sized,
{
    let older_than = config.cutoff(today);
    info!(channel = %config.channel, %older_than, keep = config.keep_num_packages, "pruning");

    config
        .packages
        .iter()
        .map(|package| prune_package(config, search, remover, older_than, package))
        .collect()
}

/// List, filter and remove the old builds of one package.
pub fn prune_package<S, R>(
    config: &PruneConfig,
    search: &S,
    remover: &R,
    older_than: NaiveDate,
    package: &str,
) -> Result<PruneSummary>
where
    S: PackageSearch + ?Sized,
    R: PackageRemover + ?Sized,
{
    let channel = &config.channel;
    let keep = config.keep_num_packages;

    let records = list_versions(search, channel, package)?;
    let found = records.len();
    println!("Found {} packages for {}", found, package.bold());
    println!("Retaining most recent {keep} packages for {}", package.bold());

    let doomed = select_for_removal(keep, older_than, records);
    println!(
        "Removing {} ({}): {}",
        package.bold(),
        doomed.len(),
        format_paths(&doomed)
    );

    let removed = remove_in_chunks(remover, channel, package, &doomed)?;

    Ok(PruneSummary {
        package: package.to_string(),
        found,
        removed,
    })
}

fn format_paths(records: &[VersionRecord]) -> String {
    let paths: Vec<&str> = records.iter().map(|r| r.relative_path.as_str()).collect();
    format!("[{}]", paths.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PruneError;
    use crate::remove::RemoveSpec;
    use crate::search::{Lookup, PackageFile};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use url::Url;

    /// Every package lives in `noarch`; anything unknown is not found.
    struct FakeChannel {
        files: HashMap<String, Vec<PackageFile>>,
    }

    impl PackageSearch for FakeChannel {
        fn search(&self, _channel: &str, package: &str, subdir: &str) -> Result<Lookup> {
            match self.files.get(package) {
                Some(files) if subdir == "noarch" => Ok(Lookup::Found(files.clone())),
                _ => Ok(Lookup::NotFound),
            }
        }
    }

    #[derive(Default)]
    struct RecordingRemover {
        calls: RefCell<Vec<Vec<RemoveSpec>>>,
    }

    impl PackageRemover for RecordingRemover {
        fn remove(&self, specs: &[RemoveSpec]) -> Result<()> {
            self.calls.borrow_mut().push(specs.to_vec());
            Ok(())
        }
    }

    fn nightlies(package: &str, days: u32) -> Vec<PackageFile> {
        (1..=days)
            .map(|day| {
                let version = format!("24.02.00a2401{day:02}");
                PackageFile {
                    file_name: format!("{package}-{version}-py_0.tar.bz2"),
                    version,
                    timestamp: 0,
                    subdir: "noarch".to_string(),
                }
            })
            .collect()
    }

    fn config(packages: &[&str], keep: usize, days_old: u64) -> PruneConfig {
        PruneConfig {
            token: "t".to_string(),
            days_old,
            channel: "rapidsai-nightly".to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
            keep_num_packages: keep,
            channel_url: Url::parse("https://conda.anaconda.org").unwrap(),
            api_url: Url::parse("https://api.anaconda.org").unwrap(),
        }
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn removes_old_builds_beyond_retention_window() {
        let channel = FakeChannel {
            files: HashMap::from([("foo".to_string(), nightlies("foo", 25))]),
        };
        let remover = RecordingRemover::default();

        // today 2024-01-20, 10 days old => cutoff 2024-01-10
        let summaries = run(&config(&["foo"], 21, 10), &channel, &remover, jan(20)).unwrap();

        assert_eq!(
            summaries,
            vec![PruneSummary { package: "foo".to_string(), found: 25, removed: 4 }]
        );
        let calls = remover.calls.borrow();
        assert_eq!(calls.len(), 1);
        let removed: Vec<String> = calls[0].iter().map(ToString::to_string).collect();
        assert_eq!(
            removed,
            vec![
                "rapidsai-nightly/foo/24.02.00a240104/noarch/foo-24.02.00a240104-py_0.tar.bz2",
                "rapidsai-nightly/foo/24.02.00a240103/noarch/foo-24.02.00a240103-py_0.tar.bz2",
                "rapidsai-nightly/foo/24.02.00a240102/noarch/foo-24.02.00a240102-py_0.tar.bz2",
                "rapidsai-nightly/foo/24.02.00a240101/noarch/foo-24.02.00a240101-py_0.tar.bz2",
            ]
        );
    }

    #[test]
    fn short_history_is_left_alone() {
        let channel = FakeChannel {
            files: HashMap::from([("foo".to_string(), nightlies("foo", 10))]),
        };
        let remover = RecordingRemover::default();

        let summaries = run(&config(&["foo"], 21, 0), &channel, &remover, jan(31)).unwrap();

        assert_eq!(summaries[0].removed, 0);
        assert!(remover.calls.borrow().is_empty());
    }

    #[test]
    fn packages_run_in_configured_order() {
        let channel = FakeChannel {
            files: HashMap::from([
                ("foo".to_string(), nightlies("foo", 3)),
                ("bar".to_string(), nightlies("bar", 3)),
            ]),
        };
        let remover = RecordingRemover::default();

        run(&config(&["bar", "foo"], 1, 0), &channel, &remover, jan(31)).unwrap();

        let packages: Vec<String> = remover
            .calls
            .borrow()
            .iter()
            .map(|chunk| chunk[0].package.clone())
            .collect();
        assert_eq!(packages, vec!["bar", "foo"]);
    }

    #[test]
    fn missing_package_stops_the_run() {
        let channel = FakeChannel {
            files: HashMap::from([("foo".to_string(), nightlies("foo", 3))]),
        };
        let remover = RecordingRemover::default();

        let err = run(&config(&["ghost", "foo"], 0, 0), &channel, &remover, jan(31)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PruneError>(),
            Some(PruneError::PackageNotFound { package, .. }) if package == "ghost"
        ));
        assert!(remover.calls.borrow().is_empty());
    }
}
