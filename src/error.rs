//! Error types for conda-prune.

/// Failures that belong to the pruning domain itself.
///
/// Transport and parsing failures from the remote services are carried as
/// [`anyhow::Error`] with context; these variants are the cases callers may
/// want to match on.
#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    /// No architecture subdirectory of the channel has this package.
    #[error("Could not find package: {package} (channel {channel})")]
    PackageNotFound { package: String, channel: String },

    /// The package list was empty once blank entries were dropped.
    #[error("No packages given: set PACKAGES or pass --packages")]
    NoPackages,

    /// The removal service rejected a file.
    #[error("Failed to remove {spec}: {status}")]
    RemoveFailed { spec: String, status: String },
}
