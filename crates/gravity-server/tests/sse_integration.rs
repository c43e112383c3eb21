#[allow(dead_code)]
mod common;

use common::{SseReader, TestServer, issue_session, run_to_completion, test_config};
use gravity_server::config::{LimitsConfig, ServerConfig};

async fn open_stream(client: &reqwest::Client, server: &TestServer, session: &str) -> SseReader {
    let resp = client
        .get(format!("{}/stream", server.session_url(session)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    SseReader::new(resp)
}

#[tokio::test]
async fn stream_opens_with_snapshot() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let session = issue_session(&client, &server).await;

    let mut reader = open_stream(&client, &server, &session).await;
    let (name, data) = reader.next_event().await;
    assert_eq!(name, "snapshot");
    assert_eq!(data["session"], session.as_str());
    assert_eq!(data["phase"], "idle");
}

#[tokio::test]
async fn stream_follows_a_run_in_order() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let session = issue_session(&client, &server).await;

    let mut reader = open_stream(&client, &server, &session).await;
    assert_eq!(reader.next_event().await.0, "snapshot");

    let resp = client
        .post(format!("{}/launch", server.session_url(&session)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let (name, data) = reader.next_event().await;
    assert_eq!(name, "phase");
    assert_eq!(data["phase"], "running");

    let mut progress = Vec::new();
    let mut step_logs = Vec::new();
    loop {
        let (name, data) = reader.next_event().await;
        assert_eq!(data["kind"], name.as_str());
        match name.as_str() {
            "progress" => progress.push(data["progress"].as_f64().unwrap()),
            "log" => {
                if let Some(step) = data["entry"].get("step") {
                    step_logs.push(step.as_u64().unwrap());
                }
            },
            "phase" => {
                assert_eq!(data["phase"], "complete");
                break;
            },
            _ => {},
        }
    }

    assert_eq!(step_logs, (0..8).collect::<Vec<u64>>());
    assert_eq!(progress.len(), 8);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*progress.last().unwrap(), 100.0);

    let (name, data) = reader.next_event().await;
    assert_eq!(name, "log");
    assert_eq!(
        data["entry"]["message"],
        "Fleet execution finished. Ready for deployment."
    );
    assert_eq!(data["entry"]["severity"], "success");
}

#[tokio::test]
async fn stream_reports_agent_transitions() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let session = issue_session(&client, &server).await;

    let mut reader = open_stream(&client, &server, &session).await;
    reader.next_event().await;
    client
        .post(format!("{}/launch", server.session_url(&session)))
        .send()
        .await
        .unwrap();

    let events = reader.collect_until("phase").await;
    // First phase event is `running`; read on to completion.
    assert_eq!(events.last().unwrap().1["phase"], "running");
    let events = reader.collect_until("phase").await;

    let gamma: Vec<String> = events
        .iter()
        .filter(|(name, data)| name == "agent" && data["agent"]["name"] == "Gamma")
        .map(|(_, data)| data["agent"]["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(gamma, vec!["working", "done"]);
}

#[tokio::test]
async fn stream_reports_deploy() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let session = issue_session(&client, &server).await;
    run_to_completion(&client, &server, &session).await;

    let mut reader = open_stream(&client, &server, &session).await;
    let (_, snapshot) = reader.next_event().await;
    assert_eq!(snapshot["phase"], "complete");
    assert_eq!(snapshot["deploy_available"], true);

    client
        .post(format!("{}/deploy", server.session_url(&session)))
        .send()
        .await
        .unwrap();

    let (name, data) = reader.next_event().await;
    assert_eq!(name, "deploy");
    assert_eq!(data["deploy"]["state"], "deploying");

    let events = reader.collect_until("deploy").await;
    let (_, last) = events.last().unwrap();
    assert_eq!(last["deploy"]["state"], "deployed");
    assert_eq!(last["deploy"]["url"], "https://gravity.vercel.app");

    let messages: Vec<&str> = events
        .iter()
        .filter(|(name, _)| name == "log")
        .map(|(_, data)| data["entry"]["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Initiating deployment sequence...",
            "Changes committed to git.",
            "Pushed to origin/main.",
            "Vercel deployment triggered.",
        ]
    );
}

#[tokio::test]
async fn subscriber_limit_enforced() {
    let config = ServerConfig {
        limits: LimitsConfig {
            max_sse_subscribers: 1,
            ..LimitsConfig::default()
        },
        ..test_config()
    };
    let server = TestServer::from_config(config).await;
    let client = reqwest::Client::new();

    let mut first = open_stream(&client, &server, "watched").await;
    first.next_event().await;

    let resp = client
        .get(format!("{}/stream", server.session_url("watched")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json["error"].is_string());
}
