//! Where served state comes from.

use std::time::Duration;

use flightlink_proto::{ControlCommand, Orientation, StateSnapshot, Vec3};

/// Supplies snapshots and accepts control input.
pub trait StateSource: Send {
    /// Current state.
    fn snapshot(&self) -> StateSnapshot;

    /// Apply a control tuple. The server clamps it first.
    fn apply_controls(&mut self, controls: ControlCommand);

    /// Advance simulated time by `dt`.
    fn advance(&mut self, dt: Duration);
}

/// Holds a fixed flight condition.
///
/// Applied controls are recorded and echoed in every snapshot, and the clock
/// advances, but nothing else moves.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldStateSource {
    state: StateSnapshot,
}

impl HoldStateSource {
    /// Hold `state`.
    pub fn new(state: StateSnapshot) -> Self {
        Self { state }
    }

    /// Level cruise at 1000 m and 50 m/s, engine at 2400 RPM.
    pub fn cruise() -> Self {
        let velocity = Vec3::new(50.0, 0.0, 0.0);
        Self::new(StateSnapshot {
            time: 0.0,
            position: Vec3::new(0.0, 0.0, -1000.0),
            velocity,
            orientation: Orientation::default(),
            rpm: 2400.0,
            altitude: 1000.0,
            airspeed: velocity.magnitude(),
            air_density: 1.112,
            controls: ControlCommand::new(0.6, 0.0, 0.0, 0.0),
        })
    }
}

impl Default for HoldStateSource {
    fn default() -> Self {
        Self::cruise()
    }
}

impl StateSource for HoldStateSource {
    fn snapshot(&self) -> StateSnapshot {
        self.state.clone()
    }

    fn apply_controls(&mut self, controls: ControlCommand) {
        self.state.controls = controls;
    }

    fn advance(&mut self, dt: Duration) {
        self.state.time += dt.as_secs_f64();
    }
}
