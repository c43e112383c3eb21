use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, NO_AGENT};
use crate::mission::MissionConfig;

/// Fixed latency of the simulated commit/push/deploy sequence.
pub const DEPLOY_DELAY: Duration = Duration::from_millis(2000);

/// One timed step of the simulated build sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTask {
    pub message: String,
    /// Agent doing the step, or [`NO_AGENT`] for fleet-wide steps.
    pub agent_id: AgentId,
    pub duration_ms: u64,
}

impl PipelineTask {
    fn new(message: impl Into<String>, agent_id: AgentId, duration_ms: u64) -> Self {
        Self {
            message: message.into(),
            agent_id,
            duration_ms,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn has_agent(&self) -> bool {
        self.agent_id != NO_AGENT
    }
}

/// Render the fleet pipeline for a mission.
///
/// The structure (count, order, agents, durations) is fixed; the mission only
/// changes the repository-fetch wording.
pub fn build_pipeline(config: &MissionConfig) -> Vec<PipelineTask> {
    vec![
        PipelineTask::new("Analyzing current design trends (2026)...", 1, 1500),
        PipelineTask::new(
            format!(
                "Fetching top {} repos with topics: [{}]...",
                config.project_count, config.github_topics
            ),
            3,
            1000,
        ),
        PipelineTask::new("Generating new Hero 3D assets...", 2, 2000),
        PipelineTask::new(
            "Writing blog post: 'The Rise of Self-Replicating Agents'...",
            1,
            1500,
        ),
        PipelineTask::new("Compiling production build...", 5, 2500),
        PipelineTask::new("Running Lighthouse performance audit...", 4, 1500),
        PipelineTask::new("Capturing visual regression screenshots...", 4, 1000),
        PipelineTask::new("All tasks completed successfully.", NO_AGENT, 500),
    ]
}

/// Total simulated run time of a pipeline.
pub fn total_duration(tasks: &[PipelineTask]) -> Duration {
    tasks.iter().map(PipelineTask::duration).sum()
}
