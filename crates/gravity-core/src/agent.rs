use serde::{Deserialize, Serialize};

/// Stable agent identifier. `0` is reserved for "no specific agent".
pub type AgentId = u32;

/// Sentinel id for pipeline steps that belong to the whole fleet.
pub const NO_AGENT: AgentId = 0;

/// Task text shown before an agent has been given anything to do.
pub const AWAITING_COMMAND: &str = "Waiting for command...";

/// Task text shown after an agent has finished a step.
pub const IDLE_TASK: &str = "Idle";

/// Lifecycle of one agent slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Done,
}

/// A named, role-tagged slot in the fleet roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub role: String,
    pub status: AgentStatus,
    pub task: String,
}

impl Agent {
    pub fn new(id: AgentId, name: &str, role: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            role: role.to_string(),
            status: AgentStatus::Idle,
            task: AWAITING_COMMAND.to_string(),
        }
    }

    /// Display initial used by the roster badges.
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}

/// The fixed five-agent fleet every session starts with.
pub fn default_roster() -> Vec<Agent> {
    vec![
        Agent::new(1, "Alpha", "Architect"),
        Agent::new(2, "Beta", "Frontend"),
        Agent::new(3, "Gamma", "Backend"),
        Agent::new(4, "Delta", "QA/Test"),
        Agent::new(5, "Epsilon", "Deployer"),
    ]
}
