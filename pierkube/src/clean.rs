use std::{collections::BTreeMap, io};

use crate::direct;
pub use crate::direct::{Cluster, ClusterSpec, Context, ContextSpec, Kind, User, UserSpec};

/// A kubeconfig keyed by entry name, which is how everything in this crate
/// looks entries up. Convert to [`direct::KubeConfig`] to write it out.
#[derive(Debug, Clone, PartialEq)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, ContextSpec>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub preferences: serde_yaml::Value,
    pub users: BTreeMap<String, UserSpec>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            contexts: BTreeMap::new(),
            current_context: String::new(),
            clusters: BTreeMap::new(),
            preferences: serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
            users: BTreeMap::new(),
        }
    }
}

impl KubeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(data: &str) -> anyhow::Result<KubeConfig> {
        direct::KubeConfig::parse(data).map(KubeConfig::from)
    }

    pub fn write_to(self, writer: impl io::Write) -> anyhow::Result<()> {
        direct::KubeConfig::from(self).write_to(writer)
    }

    /// Names of contexts whose cluster or user isn't defined in this config.
    pub fn dangling_contexts(&self) -> Vec<&str> {
        self.contexts
            .iter()
            .filter(|(_, ctx)| {
                !self.clusters.contains_key(&ctx.cluster) || !self.users.contains_key(&ctx.user)
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        Self {
            current_context: kc.current_context,
            preferences: kc.preferences,
            contexts: kc
                .contexts
                .into_iter()
                .map(|ctx| (ctx.name, ctx.context))
                .collect(),
            clusters: kc
                .clusters
                .into_iter()
                .map(|cls| (cls.name, cls.cluster))
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|usr| (usr.name, usr.user))
                .collect(),
        }
    }
}

impl From<KubeConfig> for direct::KubeConfig {
    fn from(kc: KubeConfig) -> Self {
        direct::KubeConfig {
            kind: Kind::Config,
            api_version: direct::ApiVersion::V1,
            preferences: kc.preferences,
            current_context: kc.current_context,

            clusters: kc
                .clusters
                .into_iter()
                .map(|(name, cluster)| Cluster { name, cluster })
                .collect(),
            contexts: kc
                .contexts
                .into_iter()
                .map(|(name, context)| Context { name, context })
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|(name, user)| User { name, user })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_writes_kubectl_skeleton() {
        let mut out = Vec::new();
        KubeConfig::new().write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let back: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back["kind"], serde_yaml::Value::from("Config"));
        assert_eq!(back["apiVersion"], serde_yaml::Value::from("v1"));
        assert_eq!(back["clusters"], serde_yaml::Value::Sequence(vec![]));
        assert_eq!(back["current-context"], serde_yaml::Value::from(""));
        assert!(back["preferences"].as_mapping().unwrap().is_empty());
    }

    #[test]
    fn names_become_map_keys() {
        let kc = KubeConfig::parse(
            r#"
clusters:
- name: a
  cluster: {server: "https://a"}
users:
- name: a
  user: {token: t}
contexts:
- name: a
  context: {cluster: a, user: a}
"#,
        )
        .unwrap();

        assert_eq!(kc.clusters["a"].server, "https://a");
        assert_eq!(kc.users["a"].token.as_deref(), Some("t"));
        assert!(kc.dangling_contexts().is_empty());
    }

    #[test]
    fn reports_contexts_pointing_nowhere() {
        let mut kc = KubeConfig::new();
        kc.clusters.insert("a".into(), ClusterSpec::new("https://a"));
        kc.users.insert("a".into(), UserSpec::with_token("t"));
        kc.contexts.insert(
            "good".into(),
            ContextSpec {
                user: "a".into(),
                namespace: None,
                cluster: "a".into(),
                extensions: None,
                other: Default::default(),
            },
        );
        kc.contexts.insert(
            "bad".into(),
            ContextSpec {
                user: "kubernetes-admin".into(),
                namespace: None,
                cluster: "a".into(),
                extensions: None,
                other: Default::default(),
            },
        );

        assert_eq!(kc.dangling_contexts(), vec!["bad"]);
    }
}
