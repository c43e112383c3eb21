use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, AgentStatus, IDLE_TASK, default_roster};
use crate::deploy::DeployStatus;
use crate::log::{LogEntry, LogFeed, Severity};
use crate::mission::{MissionConfig, MissionConfigError, MissionConfigPatch, ToggleView};
use crate::pipeline::{PipelineTask, build_pipeline};
use crate::session::SessionId;

/// Coarse lifecycle of a session's simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Complete,
}

impl Phase {
    /// Status-pill text shown in the control center header.
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Idle => "Standby",
            Self::Running => "Fleet Active",
            Self::Complete => "Ready to Deploy",
        }
    }
}

/// A single observable state change, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SimEvent {
    Phase { phase: Phase },
    Log { entry: LogEntry },
    Agent { agent: Agent },
    Progress { progress: f64 },
    Deploy { deploy: DeployStatus },
}

impl SimEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Phase { .. } => "phase",
            Self::Log { .. } => "log",
            Self::Agent { .. } => "agent",
            Self::Progress { .. } => "progress",
            Self::Deploy { .. } => "deploy",
        }
    }
}

/// Rejected transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    AlreadyLaunched(Phase),
    ConfigFrozen(Phase),
    InvalidConfig(MissionConfigError),
    NotRunning(Phase),
    StepInFlight(usize),
    NoStepInFlight,
    PipelineExhausted,
    DeployGateClosed(Phase),
    DeployInProgress,
    AlreadyDeployed,
    NotDeploying,
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyLaunched(phase) => {
                write!(f, "fleet already launched (phase: {phase:?})")
            },
            Self::ConfigFrozen(phase) => {
                write!(f, "mission config is frozen once launched (phase: {phase:?})")
            },
            Self::InvalidConfig(e) => write!(f, "{e}"),
            Self::NotRunning(phase) => write!(f, "pipeline is not running (phase: {phase:?})"),
            Self::StepInFlight(i) => write!(f, "step {i} is still in flight"),
            Self::NoStepInFlight => write!(f, "no step in flight"),
            Self::PipelineExhausted => write!(f, "pipeline has no remaining steps"),
            Self::DeployGateClosed(phase) => {
                write!(f, "deploy unavailable until the fleet completes (phase: {phase:?})")
            },
            Self::DeployInProgress => write!(f, "deployment already in progress"),
            Self::AlreadyDeployed => write!(f, "session already deployed"),
            Self::NotDeploying => write!(f, "no deployment in progress"),
        }
    }
}

impl From<MissionConfigError> for SimError {
    fn from(e: MissionConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

/// Returned by [`Simulator::begin_step`]: how long to suspend and what changed.
#[derive(Debug, Clone)]
pub struct StepStart {
    pub index: usize,
    pub duration: Duration,
    pub events: Vec<SimEvent>,
}

/// Orchestration state for one control-center session.
///
/// All mutation goes through the transition methods below, each of which
/// returns the events it emitted. The caller owns the waiting between
/// `begin_step` and `finish_step`.
#[derive(Debug, Clone)]
pub struct Simulator {
    session: SessionId,
    phase: Phase,
    progress: f64,
    agents: Vec<Agent>,
    log: LogFeed,
    mission: MissionConfig,
    pipeline: Vec<PipelineTask>,
    next_step: usize,
    step_in_flight: bool,
    deploy: DeployStatus,
}

impl Simulator {
    pub fn new(session: SessionId) -> Self {
        Self::with_mission(session, MissionConfig::default())
    }

    pub fn with_mission(session: SessionId, mission: MissionConfig) -> Self {
        Self {
            session,
            phase: Phase::Idle,
            progress: 0.0,
            agents: default_roster(),
            log: LogFeed::new(),
            mission,
            pipeline: Vec::new(),
            next_step: 0,
            step_in_flight: false,
            deploy: DeployStatus::Idle,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn log(&self) -> &LogFeed {
        &self.log
    }

    pub fn mission(&self) -> &MissionConfig {
        &self.mission
    }

    /// Rendered pipeline; empty until launch.
    pub fn pipeline(&self) -> &[PipelineTask] {
        &self.pipeline
    }

    pub fn steps_completed(&self) -> usize {
        self.next_step
    }

    pub fn deploy_status(&self) -> &DeployStatus {
        &self.deploy
    }

    /// Whether the deploy action would currently be accepted.
    pub fn deploy_available(&self) -> bool {
        self.phase == Phase::Complete
            && matches!(self.deploy, DeployStatus::Idle | DeployStatus::Failed { .. })
    }

    /// Edit the mission while the fleet is idle.
    pub fn update_mission(
        &mut self,
        patch: &MissionConfigPatch,
    ) -> Result<&MissionConfig, SimError> {
        if self.phase != Phase::Idle {
            return Err(SimError::ConfigFrozen(self.phase));
        }
        self.mission.apply(patch)?;
        Ok(&self.mission)
    }

    /// `idle → running`. Renders the pipeline from the mission as it is now.
    pub fn launch(&mut self) -> Result<Vec<SimEvent>, SimError> {
        if self.phase != Phase::Idle {
            return Err(SimError::AlreadyLaunched(self.phase));
        }

        self.pipeline = build_pipeline(&self.mission);
        self.phase = Phase::Running;
        tracing::info!(
            session = %self.session,
            tasks = self.pipeline.len(),
            "Fleet launched"
        );

        let greeting = format!("Initializing Control Center Session: {}", self.session);
        let mut events = vec![SimEvent::Phase { phase: self.phase }];
        events.push(self.emit(greeting, Severity::Info, None));
        events.push(self.emit("Spinning up agent fleet...", Severity::Info, None));
        Ok(events)
    }

    /// Start the next pipeline step: mark its agent working and log it.
    pub fn begin_step(&mut self) -> Result<StepStart, SimError> {
        if self.phase != Phase::Running {
            return Err(SimError::NotRunning(self.phase));
        }
        if self.step_in_flight {
            return Err(SimError::StepInFlight(self.next_step));
        }
        let index = self.next_step;
        let task = self
            .pipeline
            .get(index)
            .cloned()
            .ok_or(SimError::PipelineExhausted)?;

        self.step_in_flight = true;
        let mut events = Vec::with_capacity(2);
        if task.has_agent()
            && let Some(event) = self.set_agent(task.agent_id, AgentStatus::Working, &task.message)
        {
            events.push(event);
        }
        events.push(self.emit(task.message.clone(), Severity::Info, Some(index)));
        tracing::debug!(session = %self.session, step = index, agent = task.agent_id, "Step started");

        Ok(StepStart {
            index,
            duration: task.duration(),
            events,
        })
    }

    /// Finish the in-flight step: release its agent, advance progress, and
    /// complete the run after the last step.
    pub fn finish_step(&mut self) -> Result<Vec<SimEvent>, SimError> {
        if self.phase != Phase::Running {
            return Err(SimError::NotRunning(self.phase));
        }
        if !self.step_in_flight {
            return Err(SimError::NoStepInFlight);
        }
        let index = self.next_step;
        let agent_id = self.pipeline[index].agent_id;

        let mut events = Vec::with_capacity(4);
        if self.pipeline[index].has_agent()
            && let Some(event) = self.set_agent(agent_id, AgentStatus::Done, IDLE_TASK)
        {
            events.push(event);
        }

        self.step_in_flight = false;
        self.next_step += 1;
        self.progress = progress_after(self.next_step, self.pipeline.len()).max(self.progress);
        events.push(SimEvent::Progress {
            progress: self.progress,
        });

        if self.next_step == self.pipeline.len() {
            self.phase = Phase::Complete;
            events.push(SimEvent::Phase { phase: self.phase });
            events.push(self.emit(
                "Fleet execution finished. Ready for deployment.",
                Severity::Success,
                None,
            ));
            tracing::info!(session = %self.session, "Fleet execution finished");
        }
        Ok(events)
    }

    /// `complete → deploying`. Exclusive: a second call while deploying, or
    /// after a successful deploy, is refused.
    pub fn begin_deploy(&mut self) -> Result<Vec<SimEvent>, SimError> {
        if self.phase != Phase::Complete {
            return Err(SimError::DeployGateClosed(self.phase));
        }
        match self.deploy {
            DeployStatus::Deploying => return Err(SimError::DeployInProgress),
            DeployStatus::Deployed { .. } => return Err(SimError::AlreadyDeployed),
            DeployStatus::Idle | DeployStatus::Failed { .. } => {},
        }

        self.deploy = DeployStatus::Deploying;
        tracing::info!(session = %self.session, "Deployment sequence started");
        Ok(vec![
            SimEvent::Deploy {
                deploy: self.deploy.clone(),
            },
            self.emit("Initiating deployment sequence...", Severity::Warning, None),
        ])
    }

    /// Record the deployer's verdict. `Ok` carries the deployment URL.
    pub fn finish_deploy(
        &mut self,
        outcome: Result<String, String>,
    ) -> Result<Vec<SimEvent>, SimError> {
        if self.deploy != DeployStatus::Deploying {
            return Err(SimError::NotDeploying);
        }

        let mut events = Vec::with_capacity(4);
        match outcome {
            Ok(url) => {
                events.push(self.emit("Changes committed to git.", Severity::Success, None));
                events.push(self.emit("Pushed to origin/main.", Severity::Success, None));
                events.push(self.emit("Vercel deployment triggered.", Severity::Success, None));
                tracing::info!(session = %self.session, %url, "Deployment succeeded");
                self.deploy = DeployStatus::Deployed { url };
            },
            Err(error) => {
                events.push(self.emit(
                    format!("Deployment failed: {error}"),
                    Severity::Warning,
                    None,
                ));
                tracing::warn!(session = %self.session, %error, "Deployment failed");
                self.deploy = DeployStatus::Failed { error };
            },
        }
        events.push(SimEvent::Deploy {
            deploy: self.deploy.clone(),
        });
        Ok(events)
    }

    pub fn snapshot(&self) -> SimulatorSnapshot {
        SimulatorSnapshot {
            session: self.session.clone(),
            phase: self.phase,
            status_label: self.phase.status_label(),
            progress: self.progress,
            agents: self.agents.clone(),
            logs: self.log.entries().to_vec(),
            mission: self.mission.clone(),
            toggles: self.mission.toggle_views(),
            tasks_total: self.pipeline.len(),
            tasks_completed: self.next_step,
            deploy: self.deploy.clone(),
            deploy_available: self.deploy_available(),
        }
    }

    fn emit(&mut self, message: impl Into<String>, severity: Severity, step: Option<usize>) -> SimEvent {
        SimEvent::Log {
            entry: self.log.push(message, severity, step),
        }
    }

    fn set_agent(&mut self, id: AgentId, status: AgentStatus, task: &str) -> Option<SimEvent> {
        let agent = self.agents.iter_mut().find(|a| a.id == id)?;
        agent.status = status;
        agent.task = task.to_string();
        Some(SimEvent::Agent {
            agent: agent.clone(),
        })
    }
}

/// Progress after `completed` of `total` steps. The last step lands on
/// exactly 100 regardless of float rounding.
pub fn progress_after(completed: usize, total: usize) -> f64 {
    if total == 0 || completed >= total {
        return 100.0;
    }
    let step = 100.0 / total as f64;
    (step * completed as f64).min(100.0)
}

/// Read-only view served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorSnapshot {
    pub session: SessionId,
    pub phase: Phase,
    pub status_label: &'static str,
    pub progress: f64,
    pub agents: Vec<Agent>,
    pub logs: Vec<LogEntry>,
    pub mission: MissionConfig,
    pub toggles: Vec<ToggleView>,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    pub deploy: DeployStatus,
    pub deploy_available: bool,
}
