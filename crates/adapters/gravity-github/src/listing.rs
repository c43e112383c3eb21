use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RepoListingConfig;
use crate::fallback::fallback_repositories;

/// Subset of the GitHub repository payload shown on the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Where a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    Live,
    Fallback,
}

/// Repositories plus their provenance.
#[derive(Debug, Clone, Serialize)]
pub struct RepoListing {
    pub source: ListingSource,
    pub repositories: Vec<Repository>,
}

#[derive(Debug)]
pub enum ListingError {
    Http(reqwest::Error),
    Status(u16),
    Decode(String),
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "request failed: {e}"),
            Self::Status(code) => write!(f, "GitHub API returned {code}"),
            Self::Decode(e) => write!(f, "malformed repository payload: {e}"),
        }
    }
}

impl std::error::Error for ListingError {}

/// Fetches the portfolio owner's most recently updated public repositories.
pub struct RepoLister {
    config: RepoListingConfig,
    client: reqwest::Client,
}

impl RepoLister {
    pub fn new(config: RepoListingConfig) -> Result<Self, ListingError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gravity-control-center/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ListingError::Http)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RepoListingConfig {
        &self.config
    }

    /// One attempt against the GitHub API; no retries.
    pub async fn fetch(&self) -> Result<Vec<Repository>, ListingError> {
        let url = format!(
            "{}/users/{}/repos?sort=updated&per_page={}&type=public",
            self.config.api_base, self.config.user, self.config.per_page
        );

        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.config.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(ListingError::Http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ListingError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(ListingError::Http)?;
        serde_json::from_slice(&body).map_err(|e| ListingError::Decode(e.to_string()))
    }

    /// Live listing, or the static fallback on any failure.
    pub async fn latest(&self) -> RepoListing {
        match self.fetch().await {
            Ok(repositories) => RepoListing {
                source: ListingSource::Live,
                repositories,
            },
            Err(e) => {
                tracing::warn!(user = %self.config.user, error = %e, "GitHub fetch failed, serving fallback repositories");
                RepoListing {
                    source: ListingSource::Fallback,
                    repositories: fallback_repositories(),
                }
            },
        }
    }
}

/// Keep repositories tagged with any of the comma-separated `topics`.
/// A blank filter keeps everything.
pub fn filter_by_topics(repositories: Vec<Repository>, topics: &str) -> Vec<Repository> {
    let wanted: Vec<String> = topics
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if wanted.is_empty() {
        return repositories;
    }
    repositories
        .into_iter()
        .filter(|repo| {
            repo.topics
                .iter()
                .any(|topic| wanted.iter().any(|w| topic.eq_ignore_ascii_case(w)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> RepoListingConfig {
        RepoListingConfig {
            api_base: server.uri(),
            user: "octo".to_string(),
            per_page: 3,
            ..RepoListingConfig::default()
        }
    }

    fn github_payload() -> serde_json::Value {
        serde_json::json!([
            {
                "id": 10,
                "name": "alpha",
                "description": "First repo",
                "html_url": "https://github.com/octo/alpha",
                "homepage": "",
                "topics": ["rust", "cli"],
                "stargazers_count": 7,
                "language": "Rust",
                "updated_at": "2026-01-02T00:00:00Z",
                "fork": false
            },
            {
                "id": 11,
                "name": "beta",
                "description": null,
                "html_url": "https://github.com/octo/beta",
                "homepage": "https://beta.dev",
                "stargazers_count": 0,
                "language": null,
                "updated_at": "2026-01-01T00:00:00Z"
            }
        ])
    }

    #[test]
    fn repository_decodes_github_shape() {
        let repos: Vec<Repository> = serde_json::from_value(github_payload()).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].homepage, None);
        assert_eq!(repos[0].topics, vec!["rust", "cli"]);
        assert_eq!(repos[1].homepage.as_deref(), Some("https://beta.dev"));
        assert!(repos[1].topics.is_empty());
        assert!(repos[1].language.is_none());
    }

    #[test]
    fn topic_filter_matches_any_topic() {
        let repos = fallback_repositories();
        let kept = filter_by_topics(repos.clone(), "agentic-ai, nextjs");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "gravity");

        let kept = filter_by_topics(repos.clone(), " BCI ");
        assert_eq!(kept[0].name, "neural-interface");

        assert_eq!(filter_by_topics(repos.clone(), " , ").len(), 2);
        assert!(filter_by_topics(repos, "cobol").is_empty());
    }

    #[tokio::test]
    async fn live_listing_from_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octo/repos"))
            .and(query_param("sort", "updated"))
            .and(query_param("per_page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(github_payload()))
            .mount(&server)
            .await;

        let lister = RepoLister::new(config_for(&server)).unwrap();
        let listing = lister.latest().await;
        assert_eq!(listing.source, ListingSource::Live);
        assert_eq!(listing.repositories.len(), 2);
        assert_eq!(listing.repositories[0].name, "alpha");
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let lister = RepoLister::new(RepoListingConfig {
            token: Some("ghp_test".to_string()),
            ..config_for(&server)
        })
        .unwrap();
        assert!(lister.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limited_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let lister = RepoLister::new(config_for(&server)).unwrap();
        assert!(matches!(lister.fetch().await, Err(ListingError::Status(403))));
        let listing = lister.latest().await;
        assert_eq!(listing.source, ListingSource::Fallback);
        assert_eq!(listing.repositories, fallback_repositories());
    }

    #[tokio::test]
    async fn malformed_payload_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("```json\n[]\n```"))
            .mount(&server)
            .await;

        let lister = RepoLister::new(config_for(&server)).unwrap();
        assert!(matches!(lister.fetch().await, Err(ListingError::Decode(_))));
        assert_eq!(lister.latest().await.source, ListingSource::Fallback);
    }
}
