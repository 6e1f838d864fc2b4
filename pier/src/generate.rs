//! `pier generate`: build one kubeconfig covering every cluster.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::Args;
use console::style;
use pierkube::{derived_name, ClusterEntries, KubeConfig, MergedKubeConfig, MissingEntry};
use tracing::{debug, info, info_span};

use crate::auth::{self, BrowserCookies};
use crate::cache::ListingCache;
use crate::config::PaletteOpts;
use crate::errors::Error;
use crate::palette::{ControlPlane, PaletteClient, Project};
use crate::scope::{self, ClusterWalk};

#[derive(Debug, Args)]
pub struct Opt {
    #[clap(flatten)]
    pub palette: PaletteOpts,

    /// Write the kubeconfig here instead of stdout.
    #[clap(short, long, parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// Make this context current in the output, e.g. `Default_my-cluster`.
    #[clap(long)]
    pub current_context: Option<String>,
}

/// Why a cluster contributed nothing to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Palette returned an empty kubeconfig.
    NotProvisioned,
    /// The kubeconfig lacks one of the kubeadm entries.
    Missing(MissingEntry),
}

#[derive(Debug)]
pub struct Report {
    pub merged: MergedKubeConfig,
    pub projects: usize,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed_projects: Vec<Project>,
}

impl Report {
    pub fn no_projects(&self) -> bool {
        self.projects == 0
    }
}

/// Fetch and merge the kubeconfig of every cluster visible to `api`.
pub fn collect(
    api: &impl ControlPlane,
    cache: Option<&ListingCache>,
    keep_going: bool,
) -> anyhow::Result<Report> {
    let projects = scope::projects(api)?;
    let project_count = projects.len();
    if projects.is_empty() {
        info!("no projects found");
    }

    let mut merged = MergedKubeConfig::new();
    let mut skipped = Vec::new();
    let mut walk = ClusterWalk::new(api, projects, cache, keep_going);
    for item in walk.by_ref() {
        let (project, cluster) = item?;
        let name = derived_name(&cluster.project_name, &cluster.name);
        let _span = info_span!("cluster", %name, id = %cluster.id).entered();

        debug!("fetching kubeconfig");
        let raw = api
            .cluster_kubeconfig(&project, &cluster)
            .with_context(|| Error::FetchKubeconfig {
                cluster: name.clone(),
            })?;
        let raw = match raw {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => {
                info!("skipping cluster without a kubeconfig");
                skipped.push((name, SkipReason::NotProvisioned));
                continue;
            }
        };

        let source = KubeConfig::parse(&raw).with_context(|| Error::ParseKubeconfig {
            cluster: name.clone(),
        })?;
        match ClusterEntries::extract(&source) {
            Ok(entries) => {
                merged = merged.merge(&name, &cluster.id, entries)?;
                debug!("merged");
            }
            Err(missing) => {
                info!("skipping cluster: {missing}");
                skipped.push((name, SkipReason::Missing(missing)));
            }
        }
    }

    Ok(Report {
        merged,
        projects: project_count,
        skipped,
        failed_projects: walk.failed_projects().to_vec(),
    })
}

/// The kubeconfig to emit, with `current_context` set if asked for.
pub fn finish(merged: MergedKubeConfig, current_context: Option<&str>) -> anyhow::Result<KubeConfig> {
    let mut config = merged.into_config();
    if let Some(name) = current_context {
        if !config.contexts.contains_key(name) {
            bail!("no merged context named {name:?}");
        }
        config.current_context = name.to_owned();
    }
    Ok(config)
}

fn write_output(config: KubeConfig, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let mut buf = Vec::new();
            config.write_to(&mut buf)?;
            fs::write(path, buf).with_context(|| format!("Writing {}", path.display()))
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            config.write_to(&mut lock)
        }
    }
}

pub fn run(opt: &Opt) -> anyhow::Result<()> {
    let palette = &opt.palette;
    let credential = auth::resolve(
        palette.api_key.as_deref(),
        palette.token.as_deref(),
        palette.cookie_host(),
        &BrowserCookies,
    )?;
    let api = PaletteClient::new(&palette.base_url(), credential, palette.timeout())?;
    let cache = palette.cache();
    if let Some(cache) = &cache {
        debug!(dir = %cache.dir().display(), "caching cluster listings");
    }

    let report = collect(&api, cache.as_ref(), palette.keep_going)?;
    if report.no_projects() {
        eprintln!("{}", style("No projects found.").yellow());
    }
    info!(
        merged = report.merged.len(),
        skipped = report.skipped.len(),
        failed_projects = report.failed_projects.len(),
        "done"
    );

    let config = finish(report.merged, opt.current_context.as_deref())?;
    write_output(config, opt.output.as_deref()).context(Error::Output)
}
