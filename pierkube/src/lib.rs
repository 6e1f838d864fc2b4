//! Kubeconfig model and merging for pier.

pub mod clean;
pub mod direct;
pub mod merge;

pub use clean::*;
pub use merge::{derived_name, ClusterEntries, MergeError, MergedKubeConfig, MissingEntry};
