//! Session behavior under simulated network conditions.
//!
//! turmoil runs the reference server protocol and the session on simulated
//! hosts with controllable latency. Time is virtual, so the timeouts below
//! are simulated seconds, not wall-clock waits.

use std::{
    io,
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use async_trait::async_trait;
use flightlink_client::{ConnectError, HandshakeError, Session, SessionConfig, SessionStatus, Transport};
use flightlink_server::{HoldStateSource, ServerConfig, server::serve};

const PORT: u16 = 9090;

/// Opens turmoil TCP streams.
struct SimTransport;

#[async_trait]
impl Transport for SimTransport {
    type Stream = turmoil::net::TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream> {
        let addr = format!("{host}:{port}");
        turmoil::net::TcpStream::connect(addr.as_str()).await
    }
}

/// Reference protocol loop, one client at a time. Each client is served for
/// at most `serve_for`.
async fn run_server(serve_for: Duration) -> turmoil::Result {
    let listener = turmoil::net::TcpListener::bind((IpAddr::from(Ipv4Addr::UNSPECIFIED), PORT)).await?;
    let config = ServerConfig::default();
    loop {
        let (stream, _) = listener.accept().await?;
        let mut source = HoldStateSource::cruise();
        let _ = tokio::time::timeout(serve_for, serve(stream, &config, &mut source)).await;
    }
}

fn sim_with_latency(latency: Duration) -> turmoil::Sim<'static> {
    turmoil::Builder::new()
        .simulation_duration(Duration::from_secs(30))
        .min_message_latency(latency)
        .max_message_latency(latency)
        .build()
}

#[test]
fn controls_round_trip_under_latency() {
    let mut sim = sim_with_latency(Duration::from_millis(50));
    sim.host("server", || run_server(Duration::from_secs(60)));

    sim.client("client", async {
        let session = Session::connect_with(&SimTransport, "server", PORT, SessionConfig::default()).await?;
        assert_eq!(session.server_info().version, "1.0.0");

        let first = session.wait_for_state(Duration::from_secs(2)).await.ok_or("no state")?;
        assert_eq!(first.altitude, 1000.0);

        session.send_controls(0.7, 0.0, 0.0, 0.0).await?;
        let mut echoed = false;
        for _ in 0..20 {
            if let Some(state) = session.wait_for_next_state(Duration::from_secs(1)).await {
                if state.controls.throttle == 0.7 {
                    echoed = true;
                    break;
                }
            }
        }
        assert!(echoed, "applied controls never showed up in state");

        session.disconnect().await;
        assert_eq!(session.status(), SessionStatus::Disconnected);
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn query_reply_arrives_without_broadcast() {
    let mut sim = sim_with_latency(Duration::from_millis(20));
    sim.host("server", || async {
        let listener = turmoil::net::TcpListener::bind((IpAddr::from(Ipv4Addr::UNSPECIFIED), PORT)).await?;
        let config = ServerConfig { broadcast_interval: Duration::ZERO, ..ServerConfig::default() };
        let (stream, _) = listener.accept().await?;
        let mut source = HoldStateSource::cruise();
        serve(stream, &config, &mut source).await?;
        Ok(())
    });

    sim.client("client", async {
        let session = Session::connect_with(&SimTransport, "server", PORT, SessionConfig::default()).await?;
        assert!(session.wait_for_state(Duration::from_millis(500)).await.is_none());

        session.query_state().await?;
        let state = session.wait_for_state(Duration::from_secs(1)).await.ok_or("no reply to query")?;
        assert_eq!(state.airspeed, 50.0);

        session.disconnect().await;
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn server_going_away_disconnects_session() {
    let mut sim = sim_with_latency(Duration::from_millis(10));
    sim.host("server", || run_server(Duration::from_millis(500)));

    sim.client("client", async {
        let session = Session::connect_with(&SimTransport, "server", PORT, SessionConfig::default()).await?;
        session.wait_for_state(Duration::from_secs(1)).await.ok_or("no state")?;

        let mut waited = Duration::ZERO;
        while session.is_connected() {
            assert!(waited < Duration::from_secs(5), "disconnect not noticed");
            tokio::time::sleep(Duration::from_millis(50)).await;
            waited += Duration::from_millis(50);
        }
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert!(session.send_controls(0.5, 0.0, 0.0, 0.0).await.is_err());
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn slow_welcome_fails_handshake() {
    let mut sim = sim_with_latency(Duration::from_millis(300));
    sim.host("server", || run_server(Duration::from_secs(60)));

    sim.client("client", async {
        let config = SessionConfig { handshake_timeout: Duration::from_millis(100), ..SessionConfig::default() };
        let err = Session::connect_with(&SimTransport, "server", PORT, config).await.err().ok_or("handshake succeeded")?;
        assert!(matches!(err, ConnectError::Handshake(HandshakeError::Timeout(_))), "got {err:?}");
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn connect_timeout_bounds_the_dial() {
    let mut sim = sim_with_latency(Duration::from_millis(400));
    sim.host("server", || run_server(Duration::from_secs(60)));

    sim.client("client", async {
        let config = SessionConfig { connect_timeout: Some(Duration::from_millis(100)), ..SessionConfig::default() };
        let err = Session::connect_with(&SimTransport, "server", PORT, config).await.err().ok_or("connect succeeded")?;
        assert!(matches!(err, ConnectError::ConnectTimeout { .. }), "got {err:?}");
        Ok(())
    });

    sim.run().unwrap();
}
