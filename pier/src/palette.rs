//! Talking to the Palette API.

use std::time::Duration;

use anyhow::{bail, Context as _};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, trace};

use crate::auth::Credential;

/// Clusters requested per search page.
const SEARCH_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
    pub project_name: String,
}

/// The clusters in one project, plus the search response items as received.
#[derive(Debug, Clone)]
pub struct ClusterListing {
    pub clusters: Vec<ClusterSummary>,
    pub raw: JsonValue,
}

impl ClusterListing {
    /// Decode raw search items. `project` fills in any item without its own
    /// project name.
    pub fn from_raw(project: &Project, items: Vec<JsonValue>) -> anyhow::Result<Self> {
        let clusters = items
            .iter()
            .map(|item| {
                let summary: wire::ClusterSummary = serde_json::from_value(item.clone())
                    .context("Decoding cluster summary")?;
                Ok(ClusterSummary {
                    id: summary.metadata.uid,
                    name: summary.metadata.name,
                    project_name: summary
                        .spec_summary
                        .and_then(|spec| spec.project_meta)
                        .and_then(|meta| meta.name)
                        .unwrap_or_else(|| project.name.clone()),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            clusters,
            raw: JsonValue::Array(items),
        })
    }
}

/// The control-plane operations a run needs. Projects are listed at tenant
/// scope; everything else is scoped to the project passed in.
pub trait ControlPlane {
    fn list_projects(&self) -> anyhow::Result<Vec<Project>>;

    fn search_clusters(&self, project: &Project) -> anyhow::Result<ClusterListing>;

    /// The cluster's kubeconfig, or `None` if it hasn't been provisioned yet.
    fn cluster_kubeconfig(
        &self,
        project: &Project,
        cluster: &ClusterSummary,
    ) -> anyhow::Result<Option<String>>;
}

mod wire {
    use serde::{Deserialize, Serialize};
    use serde_json::Value as JsonValue;

    #[derive(Debug, Deserialize)]
    pub struct ObjectMeta {
        pub name: String,
        pub uid: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ProjectsMetadata {
        #[serde(default)]
        pub items: Vec<ProjectMetadata>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ProjectMetadata {
        pub metadata: ObjectMeta,
    }

    #[derive(Debug, Serialize)]
    pub struct SearchSpec {
        pub filter: JsonValue,
        pub sort: Vec<JsonValue>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResponse {
        #[serde(default)]
        pub items: Vec<JsonValue>,
        pub listmeta: Option<ListMeta>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ListMeta {
        #[serde(rename = "continue")]
        pub continue_token: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ClusterSummary {
        pub metadata: ObjectMeta,
        pub spec_summary: Option<SpecSummary>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SpecSummary {
        pub project_meta: Option<ProjectMeta>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ProjectMeta {
        pub name: Option<String>,
    }
}

/// Blocking client for the Palette REST API.
pub struct PaletteClient {
    base_url: String,
    credential: Credential,
    http: Client,
}

impl PaletteClient {
    pub fn new(base_url: &str, credential: Credential, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pier/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            credential,
            http,
        })
    }

    fn request(&self, method: Method, path: &str, project: Option<&Project>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, %url, "request");
        let mut request = self.http.request(method, &url);
        request = match &self.credential {
            Credential::ApiKey(key) => request.header("ApiKey", key),
            Credential::Token(token) => request.header("Authorization", token),
        };
        if let Some(project) = project {
            request = request.header("ProjectUid", &project.id);
        }
        request
    }

    fn send(request: RequestBuilder) -> anyhow::Result<Response> {
        Self::check(request.send()?)
    }

    fn check(response: Response) -> anyhow::Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            bail!("Palette API request failed: {} - {}", status, error_text);
        }
        Ok(response)
    }
}

impl ControlPlane for PaletteClient {
    fn list_projects(&self) -> anyhow::Result<Vec<Project>> {
        let response = Self::send(self.request(Method::GET, "/v1/dashboard/projects/metadata", None))?;
        let projects: wire::ProjectsMetadata = response.json().context("Decoding project list")?;
        Ok(projects
            .items
            .into_iter()
            .map(|item| Project {
                id: item.metadata.uid,
                name: item.metadata.name,
            })
            .collect())
    }

    fn search_clusters(&self, project: &Project) -> anyhow::Result<ClusterListing> {
        let spec = wire::SearchSpec {
            filter: json!({}),
            sort: vec![],
        };
        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;
        loop {
            let mut query = vec![("limit", SEARCH_PAGE_SIZE.to_string())];
            if let Some(token) = &continue_token {
                query.push(("continue", token.clone()));
            }
            let request = self
                .request(Method::POST, "/v1/dashboard/spectroclusters/search", Some(project))
                .query(&query)
                .json(&spec);
            let page: wire::SearchResponse = Self::send(request)?
                .json()
                .context("Decoding cluster search results")?;
            debug!(count = page.items.len(), "cluster search page");
            items.extend(page.items);

            continue_token = page
                .listmeta
                .and_then(|meta| meta.continue_token)
                .filter(|token| !token.is_empty());
            if continue_token.is_none() {
                break;
            }
        }
        ClusterListing::from_raw(project, items)
    }

    fn cluster_kubeconfig(
        &self,
        project: &Project,
        cluster: &ClusterSummary,
    ) -> anyhow::Result<Option<String>> {
        let path = format!("/v1/spectroclusters/{}/assets/kubeconfig", cluster.id);
        let request = self
            .request(Method::GET, &path, Some(project))
            .query(&[("frp", "true")]);
        let response = request.send()?;
        // Palette answers 404 until the kubeconfig asset has been generated.
        if matches!(
            response.status(),
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND
        ) {
            return Ok(None);
        }
        let response = Self::check(response)?;
        let body = response.text().context("Reading kubeconfig")?;
        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }
}
