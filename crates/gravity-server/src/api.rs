use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gravity_core::deploy::DeployStatus;
use gravity_core::mission::{
    MAX_PROJECT_COUNT, MAX_TOPICS_LEN, MIN_PROJECT_COUNT, MissionConfig, MissionConfigPatch,
};
use gravity_core::pipeline::{build_pipeline, total_duration};
use gravity_core::session::SessionId;
use gravity_core::simulator::{Phase, Simulator, SimulatorSnapshot};
use gravity_github::fallback::fallback_repositories;
use gravity_github::{ListingSource, RepoListing, filter_by_topics};

use crate::error::AppError;
use crate::fleet::{spawn_deploy, spawn_fleet_run};
use crate::state::AppState;

/// Longest project title accepted by the deploy action.
pub const MAX_TITLE_LEN: usize = 256;

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))
}

/// Response of the session issuer.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub session: SessionId,
}

/// POST /api/v1/trigger — mint a fresh control-center session id.
pub async fn issue_session() -> Json<TriggerResponse> {
    let session = SessionId::generate();
    tracing::info!(%session, "Control center session issued");
    Json(TriggerResponse {
        status: "control-center-ready",
        session,
    })
}

/// GET /api/v1/sessions/{session}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<SimulatorSnapshot>, AppError> {
    let handle = state.session(&session).await?;
    Ok(Json(handle.snapshot().await))
}

/// PATCH /api/v1/sessions/{session}/config — partial mission edit.
pub async fn update_mission(
    State(state): State<AppState>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<Json<MissionConfig>, AppError> {
    let patch: MissionConfigPatch = parse_json(&body)?;
    let handle = state.session(&session).await?;
    let mission = handle.update_mission(&patch).await?;
    tracing::debug!(session = %handle.id(), ?patch, "Mission updated");
    Ok(Json(mission))
}

#[derive(Debug, Serialize)]
pub struct LaunchResponse {
    pub phase: Phase,
    pub tasks: usize,
    pub estimated_ms: u64,
}

/// POST /api/v1/sessions/{session}/launch — start the fleet.
pub async fn launch(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<(StatusCode, Json<LaunchResponse>), AppError> {
    let handle = state.session(&session).await?;
    handle.apply(Simulator::launch).await?;

    let snapshot = handle.snapshot().await;
    let pipeline = build_pipeline(&snapshot.mission);
    spawn_fleet_run(handle, Arc::clone(&state.clock));

    Ok((
        StatusCode::ACCEPTED,
        Json(LaunchResponse {
            phase: Phase::Running,
            tasks: pipeline.len(),
            estimated_ms: total_duration(&pipeline).as_millis() as u64,
        }),
    ))
}

/// Optional body of the deploy action.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeployRequest {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub deploy: DeployStatus,
}

/// POST /api/v1/sessions/{session}/deploy — accepted only once the run is
/// complete and no other deploy is in flight or done.
pub async fn deploy(
    State(state): State<AppState>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<DeployResponse>), AppError> {
    let request: DeployRequest = if body.is_empty() {
        DeployRequest::default()
    } else {
        parse_json(&body)?
    };
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.config.deploy.default_title.clone());
    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "title exceeds {MAX_TITLE_LEN} chars"
        )));
    }

    let handle = state.session(&session).await?;
    handle.apply(Simulator::begin_deploy).await?;
    spawn_deploy(
        handle,
        Arc::clone(&state.clock),
        Arc::clone(&state.deployer),
        title,
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DeployResponse {
            deploy: DeployStatus::Deploying,
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectsQuery {
    pub topics: Option<String>,
    pub count: Option<u32>,
}

/// GET /api/v1/projects — recent public repositories, optionally filtered
/// by topic. Upstream failures fall back to a fixed list.
pub async fn list_projects(
    State(state): State<AppState>,
    query: Result<Query<ProjectsQuery>, QueryRejection>,
) -> Result<Json<RepoListing>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let topics = query.topics.unwrap_or_default();
    if topics.len() > MAX_TOPICS_LEN {
        return Err(AppError::BadRequest(format!(
            "topics exceed {MAX_TOPICS_LEN} chars"
        )));
    }
    let count = query
        .count
        .unwrap_or(MAX_PROJECT_COUNT)
        .clamp(MIN_PROJECT_COUNT, MAX_PROJECT_COUNT) as usize;

    let listing = match state.repo_lister {
        Some(ref lister) => lister.latest().await,
        None => RepoListing {
            source: ListingSource::Fallback,
            repositories: fallback_repositories(),
        },
    };

    let mut repositories = filter_by_topics(listing.repositories, &topics);
    repositories.truncate(count);
    Ok(Json(RepoListing {
        source: listing.source,
        repositories,
    }))
}
