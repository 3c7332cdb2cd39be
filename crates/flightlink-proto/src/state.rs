//! Simulator state and control tuples.
//!
//! Field names follow the wire format exactly (`airDensity` is the only
//! camel-cased key). Snapshots are immutable values; the client shares them
//! behind an `Arc` and replaces the whole snapshot on every `state` frame.

use serde::{Deserialize, Serialize};

/// Number of values in [`StateSnapshot::features`].
pub const FEATURE_COUNT: usize = 13;

/// Cartesian vector in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component (down is positive in the simulator's frame).
    pub z: f64,
}

impl Vec3 {
    /// Create a vector from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Euler angles in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation about the body X axis.
    pub roll: f64,
    /// Rotation about the body Y axis.
    pub pitch: f64,
    /// Rotation about the body Z axis.
    pub yaw: f64,
}

/// Control tuple sent by the controller and echoed back in state frames.
///
/// Missing fields decode as `0.0`, matching what the simulator assumes for
/// an incomplete `control` message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlCommand {
    /// Engine power in `[0, 1]`.
    pub throttle: f64,
    /// Pitch control in `[-1, 1]`, positive is nose up.
    pub elevator: f64,
    /// Roll control in `[-1, 1]`, positive rolls right.
    pub aileron: f64,
    /// Yaw control in `[-1, 1]`, positive yaws right.
    pub rudder: f64,
}

impl ControlCommand {
    /// Valid throttle range.
    pub const THROTTLE_RANGE: (f64, f64) = (0.0, 1.0);

    /// Valid range for elevator, aileron and rudder.
    pub const SURFACE_RANGE: (f64, f64) = (-1.0, 1.0);

    /// Create a command without clamping.
    pub const fn new(throttle: f64, elevator: f64, aileron: f64, rudder: f64) -> Self {
        Self { throttle, elevator, aileron, rudder }
    }

    /// Copy with every value forced into its valid range.
    ///
    /// Out-of-range values saturate at the nearest bound. NaN maps to `0.0`,
    /// which is idle throttle and centered surfaces.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            throttle: clamp(self.throttle, Self::THROTTLE_RANGE),
            elevator: clamp(self.elevator, Self::SURFACE_RANGE),
            aileron: clamp(self.aileron, Self::SURFACE_RANGE),
            rudder: clamp(self.rudder, Self::SURFACE_RANGE),
        }
    }

    /// Whether every value is already inside its range.
    pub fn is_in_range(&self) -> bool {
        in_range(self.throttle, Self::THROTTLE_RANGE)
            && in_range(self.elevator, Self::SURFACE_RANGE)
            && in_range(self.aileron, Self::SURFACE_RANGE)
            && in_range(self.rudder, Self::SURFACE_RANGE)
    }
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(lo, hi) }
}

fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    (lo..=hi).contains(&value)
}

/// The most recent simulator state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Simulation time in seconds.
    pub time: f64,
    /// Position in world space, meters.
    pub position: Vec3,
    /// Velocity in world space, m/s.
    pub velocity: Vec3,
    /// Attitude.
    pub orientation: Orientation,
    /// Engine RPM.
    pub rpm: f64,
    /// Altitude above the reference plane, meters.
    pub altitude: f64,
    /// Airspeed, m/s.
    pub airspeed: f64,
    /// Air density at the current altitude, kg/m^3.
    #[serde(rename = "airDensity")]
    pub air_density: f64,
    /// Controls the simulator last applied.
    ///
    /// Query responses from the reference simulator omit this object, in
    /// which case it decodes as all zeros.
    #[serde(default)]
    pub controls: ControlCommand,
}

impl StateSnapshot {
    /// Flattened observation vector for control policies.
    ///
    /// Order: position xyz, velocity xyz, roll, pitch, yaw, rpm, altitude,
    /// airspeed, air density. Controls are not part of the observation.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.orientation.roll,
            self.orientation.pitch,
            self.orientation.yaw,
            self.rpm,
            self.altitude,
            self.airspeed,
            self.air_density,
        ]
    }
}
