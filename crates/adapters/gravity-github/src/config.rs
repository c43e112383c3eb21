/// Configuration for the repository listing fetcher.
#[derive(Debug, Clone)]
pub struct RepoListingConfig {
    /// GitHub API base URL, without trailing slash.
    pub api_base: String,
    /// Account whose public repositories are listed.
    pub user: String,
    /// Optional personal access token; raises the anonymous rate limit.
    pub token: Option<String>,
    /// Number of repositories requested per call.
    pub per_page: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RepoListingConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            user: "Hensi43".to_string(),
            token: None,
            per_page: 6,
            timeout_secs: 10,
        }
    }
}
