use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, broadcast};

use gravity_core::deploy::DeployStatus;
use gravity_core::mission::{MissionConfig, MissionConfigPatch};
use gravity_core::session::SessionId;
use gravity_core::simulator::{Phase, SimError, SimEvent, Simulator, SimulatorSnapshot, StepStart};

/// Shared access to one session's simulator and its change feed.
///
/// Events are published while the simulator lock is held, so subscribers
/// see them in transition order and a snapshot taken under the same lock
/// never races a subscription.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    simulator: Arc<Mutex<Simulator>>,
    updates: broadcast::Sender<SimEvent>,
}

impl SessionHandle {
    fn new(id: SessionId, broadcast_capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(broadcast_capacity);
        Self {
            simulator: Arc::new(Mutex::new(Simulator::new(id.clone()))),
            id,
            updates,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub async fn snapshot(&self) -> SimulatorSnapshot {
        self.simulator.lock().await.snapshot()
    }

    /// Current snapshot plus a receiver for every change after it.
    pub async fn subscribe(&self) -> (SimulatorSnapshot, broadcast::Receiver<SimEvent>) {
        let sim = self.simulator.lock().await;
        (sim.snapshot(), self.updates.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }

    /// Run a transition under the lock and publish whatever it emitted.
    pub async fn apply<F>(&self, transition: F) -> Result<Vec<SimEvent>, SimError>
    where
        F: FnOnce(&mut Simulator) -> Result<Vec<SimEvent>, SimError>,
    {
        let mut sim = self.simulator.lock().await;
        let events = transition(&mut *sim)?;
        self.publish(&events);
        Ok(events)
    }

    pub async fn begin_step(&self) -> Result<StepStart, SimError> {
        let mut sim = self.simulator.lock().await;
        let start = sim.begin_step()?;
        self.publish(&start.events);
        Ok(start)
    }

    pub async fn update_mission(&self, patch: &MissionConfigPatch) -> Result<MissionConfig, SimError> {
        let mut sim = self.simulator.lock().await;
        sim.update_mission(patch).cloned()
    }

    /// True while a run or deploy is in flight, or a transition holds the lock.
    fn is_busy(&self) -> bool {
        match self.simulator.try_lock() {
            Ok(sim) => {
                sim.phase() == Phase::Running || *sim.deploy_status() == DeployStatus::Deploying
            },
            Err(_) => true,
        }
    }

    fn publish(&self, events: &[SimEvent]) {
        for event in events {
            // No subscribers is fine; the snapshot endpoint still has it.
            let _ = self.updates.send(event.clone());
        }
    }
}

/// Returned when a new session would exceed `limits.max_sessions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCapacityReached {
    pub max: usize,
}

impl std::fmt::Display for SessionCapacityReached {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session limit reached ({} active)", self.max)
    }
}

struct SessionEntry {
    handle: SessionHandle,
    last_activity: Instant,
}

/// Registry of live sessions. A session's simulator is created on first use.
pub struct SessionManager {
    sessions: HashMap<SessionId, SessionEntry>,
    max_sessions: usize,
    broadcast_capacity: usize,
}

impl SessionManager {
    pub fn new(max_sessions: usize, broadcast_capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions,
            broadcast_capacity: broadcast_capacity.max(1),
        }
    }

    /// Look up a session, creating an idle simulator if it is new.
    pub fn get_or_create(
        &mut self,
        id: &SessionId,
    ) -> Result<SessionHandle, SessionCapacityReached> {
        if let Some(entry) = self.sessions.get_mut(id) {
            entry.last_activity = Instant::now();
            return Ok(entry.handle.clone());
        }

        if self.sessions.len() >= self.max_sessions {
            tracing::warn!(session = %id, max = self.max_sessions, "Session limit reached");
            return Err(SessionCapacityReached {
                max: self.max_sessions,
            });
        }

        let handle = SessionHandle::new(id.clone(), self.broadcast_capacity);
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                handle: handle.clone(),
                last_activity: Instant::now(),
            },
        );
        tracing::info!(session = %id, active = self.sessions.len(), "Session created");
        Ok(handle)
    }

    /// Remove sessions idle for longer than `max_idle`. Sessions with a run
    /// or deploy in flight, or with live subscribers, are kept.
    /// Returns the number of sessions removed.
    pub fn cleanup_idle_sessions(&mut self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            now.duration_since(entry.last_activity) < max_idle
                || entry.handle.subscriber_count() > 0
                || entry.handle.is_busy()
        });
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }
}
