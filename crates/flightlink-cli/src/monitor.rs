//! `flightlink-monitor`: connect, read the first state, send one control
//! command, then watch the state stream for a while.

use std::time::Duration;

use clap::Parser;
use flightlink_client::{ConnectError, ControlCommand, SendError, Session, SessionConfig, StateSnapshot};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Arguments for `flightlink-monitor`.
#[derive(Debug, Clone, Parser)]
#[command(name = "flightlink-monitor", version, about = "Connect to a flight simulator, send controls, watch state")]
pub struct MonitorArgs {
    /// Simulator host.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Simulator port.
    #[arg(short, long, default_value_t = 9090)]
    pub port: u16,

    /// Throttle to send, 0 to 1.
    #[arg(long, default_value_t = 0.75, allow_negative_numbers = true)]
    pub throttle: f64,

    /// Elevator to send, -1 to 1.
    #[arg(long, default_value_t = 0.1, allow_negative_numbers = true)]
    pub elevator: f64,

    /// Aileron to send, -1 to 1.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub aileron: f64,

    /// Rudder to send, -1 to 1.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rudder: f64,

    /// How long to watch state after sending controls, in seconds.
    #[arg(long, default_value_t = 3)]
    pub duration: u64,

    /// Sampling interval while watching, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,

    /// How long to wait for the first state, in seconds.
    #[arg(long, default_value_t = 5)]
    pub wait: u64,
}

impl MonitorArgs {
    /// The control command to send. Clamped by the session on the way out.
    pub fn command(&self) -> ControlCommand {
        ControlCommand::new(self.throttle, self.elevator, self.aileron, self.rudder)
    }
}

/// Why a monitor run failed.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Could not connect.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// No state arrived in time.
    #[error("no state received within {0:?}")]
    NoState(Duration),

    /// The control command could not be sent.
    #[error("failed to send controls: {0}")]
    Send(#[from] SendError),
}

/// What a monitor run saw.
#[derive(Debug, Clone)]
pub struct MonitorReport {
    /// First state received.
    pub first: StateSnapshot,
    /// The command as sent, after clamping.
    pub sent: ControlCommand,
    /// One snapshot per sampling tick.
    pub samples: Vec<StateSnapshot>,
}

/// Run the monitor. The session is always disconnected before returning.
///
/// # Errors
///
/// See [`MonitorError`].
pub async fn run(args: &MonitorArgs) -> Result<MonitorReport, MonitorError> {
    let session = Session::connect(&args.host, args.port, SessionConfig::default()).await?;
    let welcome = session.server_info();
    info!(greeting = %welcome.message, version = %welcome.version, "connected");

    let result = watch(&session, args).await;

    session.disconnect().await;
    info!("disconnected");
    result
}

/// One monitoring line: altitude, airspeed and the throttle the simulator
/// reports back, so the operator sees the command take effect.
pub fn sample_line(state: &StateSnapshot) -> String {
    format!(
        "alt {:6.1} m  speed {:5.1} m/s  throttle {:.2}  rpm {:4.0}",
        state.altitude, state.airspeed, state.controls.throttle, state.rpm
    )
}

async fn watch(session: &Session, args: &MonitorArgs) -> Result<MonitorReport, MonitorError> {
    let wait = Duration::from_secs(args.wait);
    let first = session.wait_for_state(wait).await.ok_or(MonitorError::NoState(wait))?;
    info!(
        "first state: altitude {:.1} m, airspeed {:.1} m/s, {:.0} RPM",
        first.altitude, first.airspeed, first.rpm
    );

    let sent = session.send_command(args.command()).await?;
    info!(
        throttle = sent.throttle,
        elevator = sent.elevator,
        aileron = sent.aileron,
        rudder = sent.rudder,
        "controls sent"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut samples = Vec::new();

    while Instant::now() < deadline {
        ticker.tick().await;
        if !session.is_connected() {
            warn!("connection lost while monitoring");
            break;
        }
        if let Some(state) = session.latest_state() {
            info!(time = state.time, "{}", sample_line(&state));
            samples.push(StateSnapshot::clone(&state));
        }
    }

    Ok(MonitorReport { first: StateSnapshot::clone(&first), sent, samples })
}
