//! Control policies.
//!
//! A policy maps the latest snapshot to the next control tuple. Whatever it
//! returns is clamped before it reaches the wire, so a policy never has to
//! range-check its own output.

use flightlink_proto::{ControlCommand, StateSnapshot};

/// Decides the next control tuple from the current state.
pub trait ControlPolicy: Send {
    /// Produce a command for `state`.
    fn decide(&mut self, state: &StateSnapshot) -> ControlCommand;
}

impl<F> ControlPolicy for F
where
    F: FnMut(&StateSnapshot) -> ControlCommand + Send,
{
    fn decide(&mut self, state: &StateSnapshot) -> ControlCommand {
        self(state)
    }
}

/// Always answers with the same command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConstantPolicy(pub ControlCommand);

impl ControlPolicy for ConstantPolicy {
    fn decide(&mut self, _state: &StateSnapshot) -> ControlCommand {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_policies() {
        let mut calls = 0;
        let mut policy = |state: &StateSnapshot| {
            calls += 1;
            ControlCommand::new(if state.airspeed < 50.0 { 1.0 } else { 0.5 }, 0.0, 0.0, 0.0)
        };

        let slow = StateSnapshot { airspeed: 10.0, ..StateSnapshot::default() };
        let fast = StateSnapshot { airspeed: 80.0, ..StateSnapshot::default() };
        assert_eq!(policy.decide(&slow).throttle, 1.0);
        assert_eq!(policy.decide(&fast).throttle, 0.5);
        assert_eq!(calls, 2);
    }

    #[test]
    fn constant_policy_ignores_state() {
        let command = ControlCommand::new(0.7, 0.1, 0.0, 0.0);
        let mut policy = ConstantPolicy(command);
        assert_eq!(policy.decide(&StateSnapshot::default()), command);
    }
}
