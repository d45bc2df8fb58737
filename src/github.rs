use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;
use crate::error::{ClonerError, Result};
use crate::provider::{ProviderRegistry, RemoteProvider, RemoteRepo};

/// Endpoint shapes tried in order for every page
const OWNER_KINDS: [&str; 2] = ["orgs", "users"];

/// GitHub marks primary limits with an exhausted quota and secondary limits
/// with `retry-after`; any other 403 is a permission failure
fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            headers.contains_key(RETRY_AFTER)
                || headers
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    == Some("0")
        }
        _ => false,
    }
}

/// GitHub REST enumeration of organization and user repositories
pub struct GitHubProvider {
    http: reqwest::Client,
    api_url: String,
    per_page: u32,
    cooldown: Duration,
    page_delay: Duration,
    request_timeout: Option<Duration>,
}

impl GitHubProvider {
    /// Build a client from configuration, picking up a token from the environment if present
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        let client_err = |reason: String| ClonerError::Api {
            url: api_url.clone(),
            reason,
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = config.token() {
            debug!("Using API token from ${}", config.token_env);
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| client_err(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("git-cloner/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| client_err(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url,
            per_page: config.per_page.max(1),
            cooldown: config.cooldown(),
            page_delay: config.page_delay(),
            request_timeout: config.request_timeout(),
        })
    }

    fn page_url(&self, kind: &str, owner: &str, page: u32) -> String {
        format!(
            "{}/{}/{}/repos?page={}&per_page={}",
            self.api_url, kind, owner, page, self.per_page
        )
    }

    /// One page of repositories, trying the organization endpoint before the user endpoint
    async fn fetch_page(&self, owner: &str, page: u32) -> Result<Vec<RemoteRepo>> {
        for kind in OWNER_KINDS {
            let url = self.page_url(kind, owner, page);
            debug!("GET {}", url);

            let response = self.http.get(&url).send().await.map_err(|e| {
                if e.is_timeout() {
                    ClonerError::Timeout {
                        operation: format!("GET {url}"),
                        after: self.request_timeout.unwrap_or_default(),
                    }
                } else {
                    ClonerError::Api {
                        url: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

            match response.status() {
                StatusCode::NOT_FOUND => {
                    debug!("{} not found under /{}", owner, kind);
                    continue;
                }
                status if is_rate_limited(status, response.headers()) => {
                    return Err(ClonerError::RateLimited {
                        host: self.api_url.clone(),
                    });
                }
                status if !status.is_success() => {
                    return Err(ClonerError::Api {
                        url,
                        reason: format!("HTTP {status}"),
                    });
                }
                _ => {}
            }

            return response
                .json::<Vec<RemoteRepo>>()
                .await
                .map_err(|e| ClonerError::Api {
                    url,
                    reason: format!("unexpected response body: {e}"),
                });
        }

        Err(ClonerError::NotFound {
            name: owner.to_string(),
        })
    }
}

#[async_trait]
impl RemoteProvider for GitHubProvider {
    async fn list_repositories(&self, owner: &str) -> Result<Vec<RemoteRepo>> {
        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            let items = match self.fetch_page(owner, page).await {
                Ok(items) => items,
                Err(ClonerError::RateLimited { .. }) => {
                    warn!(
                        "Rate limited by GitHub API. Waiting {} seconds...",
                        self.cooldown.as_secs()
                    );
                    tokio::time::sleep(self.cooldown).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if items.is_empty() {
                break;
            }

            debug!("Page {} for {}: {} repositories", page, owner, items.len());
            repositories.extend(items);
            page += 1;

            // Be nice to the API
            tokio::time::sleep(self.page_delay).await;
        }

        info!("Found {} repositories for {}", repositories.len(), owner);
        Ok(repositories)
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}

/// Registry with the GitHub provider registered for its configured host
pub fn default_registry(config: &GitHubConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(config.host.clone(), Arc::new(GitHubProvider::new(config)?));
    Ok(registry)
}
