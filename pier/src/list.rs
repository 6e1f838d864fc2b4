//! `pier list`: show which clusters `generate` would pick up, and the context
//! names they'd get, without fetching any kubeconfigs.

use clap::Args;
use console::style;
use pierkube::derived_name;
use tabular::{row, Table};

use crate::auth::{self, BrowserCookies};
use crate::config::PaletteOpts;
use crate::palette::{ControlPlane, PaletteClient};
use crate::scope::{self, ClusterWalk};

#[derive(Debug, Args)]
pub struct Opt {
    #[clap(flatten)]
    pub palette: PaletteOpts,
}

/// Build the listing table. Context names claimed by more than one cluster
/// are flagged, since `generate` would refuse them.
pub fn table(api: &impl ControlPlane, opts: &PaletteOpts) -> anyhow::Result<Option<Table>> {
    let projects = scope::projects(api)?;
    if projects.is_empty() {
        return Ok(None);
    }

    let cache = opts.cache();
    let mut rows = Vec::new();
    for item in ClusterWalk::new(api, projects, cache.as_ref(), opts.keep_going) {
        let (project, cluster) = item?;
        let name = derived_name(&cluster.project_name, &cluster.name);
        rows.push((project.name, cluster.name, name, cluster.id));
    }

    let mut table = Table::new("{:<}  {:<}  {:<}  {:<}");
    table.add_row(row!("PROJECT", "CLUSTER", "CONTEXT", "ID"));
    for (project, cluster, context, id) in &rows {
        let taken = rows.iter().filter(|row| &row.2 == context).count() > 1;
        let context = if taken {
            format!("{context} (duplicate)")
        } else {
            context.clone()
        };
        table.add_row(row!(project, cluster, context, id));
    }
    Ok(Some(table))
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

    match table(&api, palette)? {
        Some(table) => print!("{table}"),
        None => eprintln!("{}", style("No projects found.").yellow()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::tests::FakePalette;

    fn opts() -> PaletteOpts {
        PaletteOpts {
            host: "api.spectrocloud.com".into(),
            api_key: None,
            token: None,
            timeout_secs: 30,
            cache_dir: None,
            no_cache: true,
            keep_going: false,
        }
    }

    #[test]
    fn lists_context_names_without_fetching() {
        let api = FakePalette::default()
            .project("p1", "Retail")
            .cluster("p1", "c1", "edge", None)
            .cluster("p1", "c2", "core", None);

        let text = table(&api, &opts()).unwrap().unwrap().to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PROJECT"));
        assert!(lines[1].contains("Retail_edge") && lines[1].contains("c1"));
        assert!(lines[2].contains("Retail_core"));
        assert!(!api.calls.borrow().iter().any(|call| call.starts_with("kubeconfig")));
    }

    #[test]
    fn flags_duplicate_context_names() {
        let api = FakePalette::default()
            .project("p1", "Shared")
            .project("p2", "Shared")
            .cluster("p1", "c1", "edge", None)
            .cluster("p2", "c2", "edge", None);

        let text = table(&api, &opts()).unwrap().unwrap().to_string();
        assert_eq!(text.matches("Shared_edge (duplicate)").count(), 2);
    }

    #[test]
    fn no_projects_means_no_table() {
        assert!(table(&FakePalette::default(), &opts()).unwrap().is_none());
    }
}
