use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use gravity_core::session::SessionId;
use gravity_github::RepoLister;

use crate::auth::AuthConfig;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::fleet::{Clock, Deployer, SimulatedDeployer, TokioClock};
use crate::rate_limit::IpRateLimiter;
use crate::session_manager::{SessionHandle, SessionManager};

pub type SharedSessionManager = Arc<RwLock<SessionManager>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SharedSessionManager,
    pub auth: AuthConfig,
    pub clock: Arc<dyn Clock>,
    pub deployer: Arc<dyn Deployer>,
    /// None when the listing is disabled or its client failed to build.
    pub repo_lister: Option<Arc<RepoLister>>,
    pub api_rate_limiter: Arc<IpRateLimiter>,
    pub sse_subscriber_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let deployer = Arc::new(SimulatedDeployer::new(config.deploy.domain.clone()));
        Self::with_runtime(config, Arc::new(TokioClock), deployer)
    }

    /// Build state with an explicit clock and deployer.
    pub fn with_runtime(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        let auth = AuthConfig {
            webhook_secret: config.auth.webhook_secret.clone(),
        };

        let repo_lister = if config.github.enabled {
            match RepoLister::new(config.github.listing_config()) {
                Ok(lister) => Some(Arc::new(lister)),
                Err(e) => {
                    tracing::warn!(error = %e, "Repository listing disabled");
                    None
                },
            }
        } else {
            None
        };

        Self {
            sessions: Arc::new(RwLock::new(SessionManager::new(
                config.limits.max_sessions,
                config.limits.broadcast_capacity,
            ))),
            auth,
            clock,
            deployer,
            repo_lister,
            api_rate_limiter: Arc::new(IpRateLimiter::new(
                config.limits.api_rate_limit_burst as f64,
                config.limits.api_rate_limit_per_sec,
            )),
            sse_subscriber_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }

    /// Resolve a client-supplied session id to its (possibly new) session.
    pub async fn session(&self, raw: &str) -> Result<SessionHandle, AppError> {
        let id = SessionId::parse(raw)?;
        let mut sessions = self.sessions.write().await;
        sessions
            .get_or_create(&id)
            .map_err(|e| AppError::Unavailable(e.to_string()))
    }
}

/// Counts a live connection for as long as it is held.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
