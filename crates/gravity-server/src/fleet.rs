use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use gravity_core::deploy::{deploy_url, project_slug};
use gravity_core::pipeline::DEPLOY_DELAY;
use gravity_core::simulator::{Phase, SimError, SimEvent, Simulator};

use crate::session_manager::SessionHandle;

/// Source of the pauses between pipeline steps.
pub trait Clock: Send + Sync + 'static {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Wall-clock pauses via the tokio timer.
pub struct TokioClock;

impl Clock for TokioClock {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Records every requested pause and returns immediately.
#[derive(Default)]
pub struct InstantClock {
    slept: std::sync::Mutex<Vec<Duration>>,
}

impl InstantClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses requested so far, in order.
    pub fn slept(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Clock for InstantClock {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
        Box::pin(tokio::task::yield_now())
    }
}

/// Turns a project title into a deployment URL, or explains why not.
pub trait Deployer: Send + Sync + 'static {
    fn deploy(&self, title: &str) -> Result<String, String>;
}

/// No real hosting call: the URL is derived from the title's slug.
pub struct SimulatedDeployer {
    domain: String,
}

impl SimulatedDeployer {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl Deployer for SimulatedDeployer {
    fn deploy(&self, title: &str) -> Result<String, String> {
        if project_slug(title).trim_matches('-').is_empty() {
            return Err(format!("project title {title:?} has no usable characters"));
        }
        Ok(deploy_url(title, &self.domain))
    }
}

/// Drive a launched session through its pipeline on a background task.
pub fn spawn_fleet_run(handle: SessionHandle, clock: Arc<dyn Clock>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_pipeline(&handle, clock.as_ref()).await {
            tracing::warn!(session = %handle.id(), error = %e, "Fleet run stopped early");
        }
    })
}

/// Step through every remaining task, pausing for each task's duration
/// with the lock released.
pub async fn run_pipeline(handle: &SessionHandle, clock: &dyn Clock) -> Result<(), SimError> {
    loop {
        let start = handle.begin_step().await?;
        tracing::debug!(session = %handle.id(), step = start.index, "Waiting on step");
        clock.sleep(start.duration).await;

        let events = handle.apply(Simulator::finish_step).await?;
        if events.iter().any(|e| {
            matches!(
                e,
                SimEvent::Phase {
                    phase: Phase::Complete
                }
            )
        }) {
            return Ok(());
        }
    }
}

/// Complete an accepted deploy on a background task.
pub fn spawn_deploy(
    handle: SessionHandle,
    clock: Arc<dyn Clock>,
    deployer: Arc<dyn Deployer>,
    title: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_deploy(&handle, clock.as_ref(), deployer.as_ref(), &title).await {
            tracing::warn!(session = %handle.id(), error = %e, "Deploy could not be recorded");
        }
    })
}

/// Wait out the deploy delay, then record the deployer's verdict.
pub async fn run_deploy(
    handle: &SessionHandle,
    clock: &dyn Clock,
    deployer: &dyn Deployer,
    title: &str,
) -> Result<(), SimError> {
    clock.sleep(DEPLOY_DELAY).await;
    let outcome = deployer.deploy(title);
    handle
        .apply(move |sim| sim.finish_deploy(outcome))
        .await
        .map(|_| ())
}
