//! Walking every cluster in every project.

use std::vec;

use anyhow::Context as _;
use tracing::{info, warn};

use crate::cache::ListingCache;
use crate::errors::Error;
use crate::palette::{ClusterSummary, ControlPlane, Project};

/// Lists projects at tenant scope.
pub fn projects(api: &impl ControlPlane) -> anyhow::Result<Vec<Project>> {
    api.list_projects().context(Error::ListProjects)
}

/// Yields `(project, cluster)` pairs, searching each project only once the
/// previous one's clusters have been handed out.
pub struct ClusterWalk<'a, A> {
    api: &'a A,
    cache: Option<&'a ListingCache>,
    keep_going: bool,
    projects: vec::IntoIter<Project>,
    current: Option<(Project, vec::IntoIter<ClusterSummary>)>,
    failed: Vec<Project>,
}

impl<'a, A: ControlPlane> ClusterWalk<'a, A> {
    pub fn new(
        api: &'a A,
        projects: Vec<Project>,
        cache: Option<&'a ListingCache>,
        keep_going: bool,
    ) -> Self {
        Self {
            api,
            cache,
            keep_going,
            projects: projects.into_iter(),
            current: None,
            failed: Vec::new(),
        }
    }

    /// Projects skipped because their clusters couldn't be listed.
    pub fn failed_projects(&self) -> &[Project] {
        &self.failed
    }

    fn enter(&mut self, project: Project) -> anyhow::Result<()> {
        let listing = match self.api.search_clusters(&project) {
            Ok(listing) => listing,
            Err(err) if self.keep_going => {
                warn!(project = %project.name, "skipping project: {err:#}");
                self.failed.push(project);
                return Ok(());
            }
            Err(err) => {
                return Err(err.context(Error::SearchClusters {
                    project: project.name,
                }))
            }
        };
        info!(project = %project.name, clusters = listing.clusters.len(), "listed clusters");

        if let Some(cache) = self.cache {
            if let Err(err) = cache.store(&project.id, &listing.raw) {
                warn!(project = %project.name, "could not cache cluster listing: {err:#}");
            }
        }

        self.current = Some((project, listing.clusters.into_iter()));
        Ok(())
    }
}

impl<'a, A: ControlPlane> Iterator for ClusterWalk<'a, A> {
    type Item = anyhow::Result<(Project, ClusterSummary)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((project, clusters)) = &mut self.current {
                if let Some(cluster) = clusters.next() {
                    return Some(Ok((project.clone(), cluster)));
                }
            }
            self.current = None;

            let project = self.projects.next()?;
            if let Err(err) = self.enter(project) {
                // Stop after a fatal error.
                self.projects = Vec::new().into_iter();
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use anyhow::bail;
    use serde_json::json;

    use super::*;
    use crate::palette::ClusterListing;

    /// In-memory control plane. Records the calls made against it.
    #[derive(Default)]
    pub struct FakePalette {
        pub projects: Vec<Project>,
        pub clusters: BTreeMap<String, Vec<ClusterSummary>>,
        pub failing_projects: Vec<String>,
        pub kubeconfigs: BTreeMap<String, String>,
        pub failing_clusters: Vec<String>,
        pub fail_project_list: bool,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakePalette {
        pub fn project(mut self, id: &str, name: &str) -> Self {
            self.projects.push(Project {
                id: id.into(),
                name: name.into(),
            });
            self.clusters.entry(id.into()).or_default();
            self
        }

        pub fn cluster(mut self, project_id: &str, id: &str, name: &str, kubeconfig: Option<&str>) -> Self {
            let project_name = self
                .projects
                .iter()
                .find(|p| p.id == project_id)
                .map(|p| p.name.clone())
                .expect("add the project first");
            self.clusters
                .entry(project_id.into())
                .or_default()
                .push(ClusterSummary {
                    id: id.into(),
                    name: name.into(),
                    project_name,
                });
            if let Some(kubeconfig) = kubeconfig {
                self.kubeconfigs.insert(id.into(), kubeconfig.into());
            }
            self
        }
    }

    impl ControlPlane for FakePalette {
        fn list_projects(&self) -> anyhow::Result<Vec<Project>> {
            self.calls.borrow_mut().push("projects".into());
            if self.fail_project_list {
                bail!("401 Unauthorized");
            }
            Ok(self.projects.clone())
        }

        fn search_clusters(&self, project: &Project) -> anyhow::Result<ClusterListing> {
            self.calls.borrow_mut().push(format!("search {}", project.id));
            if self.failing_projects.contains(&project.id) {
                bail!("500 Internal Server Error");
            }
            let clusters = self.clusters.get(&project.id).cloned().unwrap_or_default();
            let raw = clusters
                .iter()
                .map(|c| json!({"metadata": {"name": c.name, "uid": c.id}}))
                .collect();
            Ok(ClusterListing {
                clusters,
                raw: serde_json::Value::Array(raw),
            })
        }

        fn cluster_kubeconfig(
            &self,
            _project: &Project,
            cluster: &ClusterSummary,
        ) -> anyhow::Result<Option<String>> {
            self.calls.borrow_mut().push(format!("kubeconfig {}", cluster.id));
            if self.failing_clusters.contains(&cluster.id) {
                bail!("connection reset");
            }
            Ok(self.kubeconfigs.get(&cluster.id).cloned())
        }
    }

    fn names(walk: ClusterWalk<'_, FakePalette>) -> Vec<String> {
        walk.map(|item| {
            let (project, cluster) = item.unwrap();
            format!("{}/{}", project.name, cluster.name)
        })
        .collect()
    }

    #[test]
    fn walks_projects_in_order() {
        let api = FakePalette::default()
            .project("p1", "P1")
            .project("p2", "P2")
            .project("p3", "P3")
            .cluster("p1", "c1", "C1", None)
            .cluster("p1", "c2", "C2", None)
            .cluster("p3", "c3", "C1", None);
        let projects = projects(&api).unwrap();

        let walk = ClusterWalk::new(&api, projects, None, false);
        assert_eq!(names(walk), vec!["P1/C1", "P1/C2", "P3/C1"]);
    }

    #[test]
    fn searches_lazily() {
        let api = FakePalette::default()
            .project("p1", "P1")
            .project("p2", "P2")
            .cluster("p1", "c1", "C1", None)
            .cluster("p2", "c2", "C2", None);
        let projects = projects(&api).unwrap();

        let mut walk = ClusterWalk::new(&api, projects, None, false);
        walk.next().unwrap().unwrap();
        assert_eq!(*api.calls.borrow(), vec!["projects", "search p1"]);
        walk.next().unwrap().unwrap();
        assert_eq!(*api.calls.borrow(), vec!["projects", "search p1", "search p2"]);
    }

    #[test]
    fn search_failure_stops_the_walk() {
        let mut api = FakePalette::default()
            .project("p1", "P1")
            .project("p2", "P2")
            .cluster("p2", "c2", "C2", None);
        api.failing_projects.push("p1".into());
        let projects = projects(&api).unwrap();

        let mut walk = ClusterWalk::new(&api, projects, None, false);
        let err = walk.next().unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::SearchClusters { project }) if project == "P1"
        ));
        assert!(walk.next().is_none());
    }

    #[test]
    fn keep_going_skips_failed_projects() {
        let mut api = FakePalette::default()
            .project("p1", "P1")
            .project("p2", "P2")
            .cluster("p2", "c2", "C2", None);
        api.failing_projects.push("p1".into());
        let projects = projects(&api).unwrap();

        let mut walk = ClusterWalk::new(&api, projects, None, true);
        let found: Vec<_> = walk.by_ref().map(|item| item.unwrap().1.id).collect();
        assert_eq!(found, vec!["c2"]);
        assert_eq!(walk.failed_projects()[0].id, "p1");
    }

    #[test]
    fn project_list_failure_is_fatal() {
        let mut api = FakePalette::default();
        api.fail_project_list = true;
        let err = projects(&api).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ListProjects)));
    }

    #[test]
    fn caches_each_listing() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ListingCache::new(tmp.path());
        let api = FakePalette::default()
            .project("p1", "P1")
            .project("p2", "P2")
            .cluster("p1", "c1", "C1", None);
        let projects = projects(&api).unwrap();

        let walk = ClusterWalk::new(&api, projects, Some(&cache), false);
        assert_eq!(walk.count(), 1);

        let cached: serde_json::Value =
            serde_json::from_slice(&std::fs::read(cache.path_for("p1")).unwrap()).unwrap();
        assert_eq!(cached, json!([{"metadata": {"name": "C1", "uid": "c1"}}]));
        assert!(cache.path_for("p2").exists());
    }

    #[test]
    fn cache_failure_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let cache = ListingCache::new(&blocker);
        let api = FakePalette::default()
            .project("p1", "P1")
            .cluster("p1", "c1", "C1", None);
        let projects = projects(&api).unwrap();

        let walk = ClusterWalk::new(&api, projects, Some(&cache), false);
        assert_eq!(names(walk), vec!["P1/C1"]);
    }
}
