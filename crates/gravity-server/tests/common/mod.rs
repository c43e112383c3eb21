use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use gravity_server::build_router;
use gravity_server::config::{AuthFileConfig, GitHubConfig, ServerConfig};
use gravity_server::fleet::{InstantClock, SimulatedDeployer};
use gravity_server::state::AppState;

pub const TEST_SECRET: &str = "gravity2026secret";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Offline server (no GitHub calls) with the webhook secret configured.
    pub async fn new() -> Self {
        Self::from_config(test_config()).await
    }

    /// Offline server with no webhook secret.
    pub async fn without_secret() -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig::default(),
            ..test_config()
        };
        Self::from_config(config).await
    }

    /// Pipeline and deploy pauses complete immediately.
    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let deployer = Arc::new(SimulatedDeployer::new(config.deploy.domain.clone()));
        let state = AppState::with_runtime(config, Arc::new(InstantClock::new()), deployer);
        let app = build_router(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn session_url(&self, session: &str) -> String {
        format!("{}/api/v1/sessions/{session}", self.base_url())
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        auth: AuthFileConfig {
            webhook_secret: Some(TEST_SECRET.to_string()),
        },
        github: GitHubConfig {
            enabled: false,
            ..GitHubConfig::default()
        },
        ..ServerConfig::default()
    }
}

/// Mint a session through the issuer.
pub async fn issue_session(client: &reqwest::Client, server: &TestServer) -> String {
    let resp = client
        .post(format!("{}/api/v1/trigger", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    json["session"].as_str().unwrap().to_string()
}

pub async fn snapshot(client: &reqwest::Client, server: &TestServer, session: &str) -> Value {
    let resp = client.get(server.session_url(session)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

/// Poll the snapshot until `done` holds (5s timeout).
pub async fn wait_for(
    client: &reqwest::Client,
    server: &TestServer,
    session: &str,
    done: impl Fn(&Value) -> bool,
) -> Value {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            let snap = snapshot(client, server, session).await;
            if done(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timed out waiting for session state")
}

pub async fn wait_for_phase(
    client: &reqwest::Client,
    server: &TestServer,
    session: &str,
    phase: &str,
) -> Value {
    wait_for(client, server, session, |snap| snap["phase"] == phase).await
}

/// Launch and wait until the run completes.
pub async fn run_to_completion(
    client: &reqwest::Client,
    server: &TestServer,
    session: &str,
) -> Value {
    let resp = client
        .post(format!("{}/launch", server.session_url(session)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    wait_for_phase(client, server, session, "complete").await
}

/// Messages of the log entries produced by pipeline steps.
pub fn step_messages(snapshot: &Value) -> Vec<String> {
    snapshot["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry.get("step").is_some())
        .map(|entry| entry["message"].as_str().unwrap().to_string())
        .collect()
}

pub fn count_log_messages(snapshot: &Value, message: &str) -> usize {
    snapshot["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry["message"] == message)
        .count()
}

/// Minimal reader for a `text/event-stream` response.
pub struct SseReader {
    response: reqwest::Response,
    buffer: String,
}

impl SseReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    /// Next `(event, data)` pair, skipping keep-alive comments (5s timeout).
    pub async fn next_event(&mut self) -> (String, Value) {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                if let Some(pos) = self.buffer.find("\n\n") {
                    let block: String = self.buffer.drain(..pos + 2).collect();
                    let mut name = None;
                    let mut data = String::new();
                    for line in block.lines() {
                        if let Some(v) = line.strip_prefix("event:") {
                            name = Some(v.trim().to_string());
                        } else if let Some(v) = line.strip_prefix("data:") {
                            data.push_str(v.trim_start());
                        }
                    }
                    if let Some(name) = name {
                        return (name, serde_json::from_str(&data).unwrap());
                    }
                    continue;
                }
                let chunk = self
                    .response
                    .chunk()
                    .await
                    .unwrap()
                    .expect("SSE stream ended");
                self.buffer.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .expect("Timed out waiting for SSE event")
    }

    /// Read events until one named `name` arrives, returning everything read.
    pub async fn collect_until(&mut self, name: &str) -> Vec<(String, Value)> {
        let mut events = Vec::new();
        loop {
            let event = self.next_event().await;
            let stop = event.0 == name;
            events.push(event);
            if stop {
                return events;
            }
        }
    }
}
