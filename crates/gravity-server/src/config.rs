use serde::Deserialize;

use gravity_github::RepoListingConfig;

/// Top-level server configuration, loaded from `gravity.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub auth: AuthFileConfig,
    pub limits: LimitsConfig,
    pub sessions: SessionsConfig,
    pub github: GitHubConfig,
    pub deploy: DeployConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            auth: AuthFileConfig::default(),
            limits: LimitsConfig::default(),
            sessions: SessionsConfig::default(),
            github: GitHubConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// Shared secret expected in the webhook's `x-secret-token` header.
    /// Unset means the webhook answers with a configuration error.
    pub webhook_secret: Option<String>,
}

/// Infrastructure limits (session caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_sessions: usize,
    pub max_sse_subscribers: usize,
    /// Per-session event channel depth. Subscribers further behind than
    /// this skip ahead.
    pub broadcast_capacity: usize,
    /// Issuer/webhook rate limit: max burst tokens per IP.
    pub api_rate_limit_burst: usize,
    /// Issuer/webhook rate limit: token refill rate per IP.
    pub api_rate_limit_per_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            max_sse_subscribers: 100,
            broadcast_capacity: 256,
            api_rate_limit_burst: 20,
            api_rate_limit_per_sec: 2.0,
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            idle_check_interval_secs: 60,
        }
    }
}

/// Repository listing upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// When false the projects endpoint serves the fallback list without
    /// calling out.
    pub enabled: bool,
    pub api_base: String,
    pub user: String,
    pub token: Option<String>,
    pub per_page: u32,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        let listing = RepoListingConfig::default();
        Self {
            enabled: true,
            api_base: listing.api_base,
            user: listing.user,
            token: listing.token,
            per_page: listing.per_page,
            timeout_secs: listing.timeout_secs,
        }
    }
}

impl GitHubConfig {
    pub fn listing_config(&self) -> RepoListingConfig {
        RepoListingConfig {
            api_base: self.api_base.clone(),
            user: self.user.clone(),
            token: self.token.clone(),
            per_page: self.per_page,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Simulated deployment settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Hosting domain appended to the project slug.
    pub domain: String,
    /// Project title used when the deploy request carries none.
    pub default_title: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            domain: "vercel.app".to_string(),
            default_title: "gravity".to_string(),
        }
    }
}

impl ServerConfig {
    /// Check the configuration, logging warnings for questionable settings.
    /// Returns every fatal problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }

        match self.auth.webhook_secret.as_deref() {
            None => tracing::warn!(
                "No webhook secret configured; the rebuild webhook will answer 500"
            ),
            Some("") => problems.push("auth.webhook_secret must not be empty".to_string()),
            Some(_) => {},
        }

        if self.limits.max_sessions == 0 {
            problems.push("limits.max_sessions must be > 0".to_string());
        }
        if self.limits.max_sse_subscribers == 0 {
            problems.push("limits.max_sse_subscribers must be > 0".to_string());
        }
        if self.limits.broadcast_capacity == 0 {
            problems.push("limits.broadcast_capacity must be > 0".to_string());
        }
        if self.limits.api_rate_limit_burst == 0 {
            problems.push("limits.api_rate_limit_burst must be > 0".to_string());
        }
        if self.limits.api_rate_limit_per_sec <= 0.0 {
            problems.push("limits.api_rate_limit_per_sec must be > 0".to_string());
        }

        if self.sessions.idle_timeout_secs == 0 {
            problems.push("sessions.idle_timeout_secs must be > 0".to_string());
        }
        if self.sessions.idle_check_interval_secs == 0 {
            problems.push("sessions.idle_check_interval_secs must be > 0".to_string());
        }

        if self.github.enabled {
            if self.github.per_page == 0 {
                problems.push("github.per_page must be > 0".to_string());
            }
            if self.github.token.is_none() {
                tracing::warn!("GitHub listing enabled without a token; unauthenticated rate limits apply");
            }
        }

        if self.deploy.domain.is_empty() {
            problems.push("deploy.domain must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Load config from `gravity.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("gravity.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from gravity.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse gravity.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No gravity.toml found, using defaults");
                ServerConfig::default()
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `GRAVITY_*` overrides. Empty or unparsable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = var("GRAVITY_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(root) = var("GRAVITY_WEB_ROOT") {
            self.web_root = root;
        }
        if let Some(secret) = var("GRAVITY_WEBHOOK_SECRET") {
            self.auth.webhook_secret = Some(secret);
        }
        if let Some(token) = var("GRAVITY_GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(user) = var("GRAVITY_GITHUB_USER") {
            self.github.user = user;
        }
        if let Some(val) = var("GRAVITY_MAX_SESSIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_sessions = n;
        }
        if let Some(val) = var("GRAVITY_MAX_SSE_SUBSCRIBERS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_sse_subscribers = n;
        }
    }
}
