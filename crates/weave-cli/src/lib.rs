//! Library interface for the weave binding generator

pub mod error;
pub mod run;
pub mod stats;
pub mod workspace;

pub use error::RunError;
pub use run::{run, Collaborators, RunOutput, RunRequest};
pub use stats::RunStats;
pub use workspace::{JsonModelBuilder, ManifestParser, MirrorFetcher, PackageDump};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "weave.toml";
/// Default binding list file name.
pub const BINDING_LIST_FILE: &str = "bindings.toml";
/// Default directory module trees are fetched into.
pub const SOURCE_DIR: &str = "_srcrepos";
/// Enables the statistics report.
pub const STATS_ENV: &str = "WEAVE_STATS";
