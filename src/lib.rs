//! # conda-prune
//!
//! Retires old nightly builds from an anaconda.org channel. For each package
//! the newest builds are always kept, and of the rest every build older than
//! a cutoff date is deleted in batches.

pub mod config;
pub mod error;
pub mod prune;
pub mod record;
pub mod remove;
pub mod retention;
pub mod search;

pub use config::{PruneArgs, PruneConfig};
pub use error::PruneError;
pub use record::VersionRecord;
pub use remove::{AnacondaRemover, PackageRemover, RemoveSpec};
pub use search::{Lookup, PackageFile, PackageSearch, RepodataSearch};
