//! Remote repository enumeration abstraction
//!
//! A [`RemoteProvider`] lists the repositories of an organization or user on
//! one hosting service. Providers are registered per host in a
//! [`ProviderRegistry`]; the sync engine only ever talks to the trait.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ClonerError, Result};

/// Summary of one remote repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepo {
    pub name: String,
    /// HTTPS clone URL
    pub clone_url: String,
    /// SSH clone URL
    pub ssh_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub default_branch: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lists repositories for an organization or user.
///
/// Implement this trait to add support for another hosting service.
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Every repository owned by `owner`, in listing order
    async fn list_repositories(&self, owner: &str) -> Result<Vec<RemoteRepo>>;

    /// Provider name for display/logging
    fn provider_name(&self) -> &'static str;
}

/// Providers keyed by the host name found in URLs
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn RemoteProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, host: impl Into<String>, provider: Arc<dyn RemoteProvider>) {
        self.providers.insert(host.into(), provider);
    }

    /// Provider for `host`, or [`ClonerError::UnsupportedHost`]
    pub fn for_host(&self, host: &str) -> Result<Arc<dyn RemoteProvider>> {
        self.providers
            .get(host)
            .cloned()
            .ok_or_else(|| ClonerError::UnsupportedHost {
                host: host.to_string(),
            })
    }

    /// Enumerate `owner` on `host`
    pub async fn list_repositories(&self, host: &str, owner: &str) -> Result<Vec<RemoteRepo>> {
        let provider = self.for_host(host)?;
        tracing::debug!("Listing {} via {}", owner, provider.provider_name());
        provider.list_repositories(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct Fixed(Vec<RemoteRepo>);

    #[async_trait]
    impl RemoteProvider for Fixed {
        async fn list_repositories(&self, _owner: &str) -> Result<Vec<RemoteRepo>> {
            Ok(self.0.clone())
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn repo(name: &str) -> RemoteRepo {
        RemoteRepo {
            name: name.to_string(),
            clone_url: format!("https://example.com/acme/{name}.git"),
            ssh_url: format!("git@example.com:acme/{name}.git"),
            default_branch: "main".to_string(),
            description: String::new(),
            private: false,
            fork: false,
        }
    }

    #[tokio::test]
    async fn test_unknown_host_is_unsupported() {
        let registry = ProviderRegistry::new();
        let err = registry
            .list_repositories("gitlab.com", "acme")
            .await
            .unwrap_err();
        assert_matches!(err, ClonerError::UnsupportedHost { ref host } if host == "gitlab.com");
    }

    #[tokio::test]
    async fn test_registered_host_dispatches() {
        let mut registry = ProviderRegistry::new();
        registry.register("example.com", Arc::new(Fixed(vec![repo("widget")])));

        let repos = registry
            .list_repositories("example.com", "acme")
            .await
            .unwrap();
        assert_eq!(repos, vec![repo("widget")]);
    }

    #[test]
    fn test_descriptor_tolerates_nulls() {
        let json = r#"{
            "name": "widget",
            "clone_url": "https://github.com/acme/widget.git",
            "ssh_url": "git@github.com:acme/widget.git",
            "default_branch": "main",
            "description": null,
            "private": false,
            "fork": true,
            "stargazers_count": 12
        }"#;
        let parsed: RemoteRepo = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.description, "");
        assert!(parsed.fork);
    }
}
