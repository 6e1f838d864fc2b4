//! Merging per-cluster kubeconfigs into one.
//!
//! Every kubeconfig Palette hands out uses the same kubeadm names for its
//! entries, so they can't simply be concatenated. Each cluster's entries are
//! copied in under a name derived from its project and cluster names, and the
//! context is rewritten to point at the renamed cluster and user.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::clean::{ClusterSpec, ContextSpec, KubeConfig, UserSpec};

/// Cluster entry name in a kubeadm-generated kubeconfig.
pub const CLUSTER_ENTRY: &str = "kubernetes";
/// User entry name in a kubeadm-generated kubeconfig.
pub const USER_ENTRY: &str = "kubernetes-admin";
/// Context entry name in a kubeadm-generated kubeconfig.
pub const CONTEXT_ENTRY: &str = "kubernetes-admin@kubernetes";

/// The name a cluster's entries get in the merged config.
pub fn derived_name(project_name: &str, cluster_name: &str) -> String {
    format!("{project_name}_{cluster_name}")
}

/// Which conventional entry a kubeconfig was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntry {
    Cluster,
    User,
    Context,
}

impl fmt::Display for MissingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, name) = match self {
            MissingEntry::Cluster => ("cluster", CLUSTER_ENTRY),
            MissingEntry::User => ("user", USER_ENTRY),
            MissingEntry::Context => ("context", CONTEXT_ENTRY),
        };
        write!(f, "no {kind} named {name:?}")
    }
}

/// The three entries that make one cluster usable, copied out of its own
/// kubeconfig.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEntries {
    pub cluster: ClusterSpec,
    pub user: UserSpec,
    pub context: ContextSpec,
}

impl ClusterEntries {
    pub fn extract(source: &KubeConfig) -> Result<Self, MissingEntry> {
        let cluster = source
            .clusters
            .get(CLUSTER_ENTRY)
            .ok_or(MissingEntry::Cluster)?;
        let user = source.users.get(USER_ENTRY).ok_or(MissingEntry::User)?;
        let context = source
            .contexts
            .get(CONTEXT_ENTRY)
            .ok_or(MissingEntry::Context)?;

        Ok(Self {
            cluster: cluster.clone(),
            user: user.clone(),
            context: context.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("clusters {existing} and {incoming} would both be named {name:?}")]
    NameCollision {
        name: String,
        existing: String,
        incoming: String,
    },
}

/// Accumulates merged entries. Every name present has exactly one cluster,
/// user and context, and each context refers to its own name.
#[derive(Debug, Clone, Default)]
pub struct MergedKubeConfig {
    config: KubeConfig,
    /// Derived name -> id of the cluster that claimed it.
    owners: BTreeMap<String, String>,
}

impl MergedKubeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one cluster's entries under `name`. `owner` identifies the source
    /// cluster: merging the same owner again replaces its entries, while a
    /// different owner claiming a taken name is an error.
    pub fn merge(
        mut self,
        name: &str,
        owner: &str,
        entries: ClusterEntries,
    ) -> Result<Self, MergeError> {
        if let Some(existing) = self.owners.get(name) {
            if existing != owner {
                return Err(MergeError::NameCollision {
                    name: name.to_owned(),
                    existing: existing.clone(),
                    incoming: owner.to_owned(),
                });
            }
            debug!(name, owner, "replacing entries for cluster merged earlier");
        }

        let ClusterEntries {
            cluster,
            user,
            mut context,
        } = entries;
        context.cluster = name.to_owned();
        context.user = name.to_owned();

        self.config.clusters.insert(name.to_owned(), cluster);
        self.config.users.insert(name.to_owned(), user);
        self.config.contexts.insert(name.to_owned(), context);
        self.owners.insert(name.to_owned(), owner.to_owned());

        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    pub fn config(&self) -> &KubeConfig {
        &self.config
    }

    pub fn into_config(self) -> KubeConfig {
        self.config
    }
}
