pub mod agent;
pub mod deploy;
pub mod log;
pub mod mission;
pub mod pipeline;
pub mod session;
pub mod simulator;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::session::SessionId;
    use crate::simulator::{SimEvent, Simulator};

    /// Create an idle simulator for the given session id.
    pub fn make_simulator(session: &str) -> Simulator {
        let id = SessionId::parse(session).expect("test session id must be valid");
        Simulator::new(id)
    }

    /// Walk a launched simulator through every remaining step without
    /// waiting, returning all emitted events in order.
    pub fn drive_pipeline(sim: &mut Simulator) -> Vec<SimEvent> {
        let mut events = Vec::new();
        while sim.steps_completed() < sim.pipeline().len() {
            let start = sim.begin_step().expect("begin_step");
            events.extend(start.events);
            events.extend(sim.finish_step().expect("finish_step"));
        }
        events
    }
}
