//! Accept loop and per-client protocol handling.

use std::{net::SocketAddr, time::Duration};

use flightlink_proto::{
    Ack, CodecError, ErrorMessage, GET_STATE_COMMAND, LineBuffer, ProtocolMessage, Welcome, decode_bytes, encode,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{config::ServerConfig, error::ServerError, source::StateSource};

/// Reply text for an accepted `control` frame.
pub const CONTROL_ACK: &str = "Control command received";
/// Reply text for a `query` with an unknown command.
pub const UNKNOWN_QUERY: &str = "Unknown query command";
/// Reply text for a frame whose `type` the server does not accept.
pub const UNKNOWN_TYPE: &str = "Unknown message type";
/// Reply text for a line that is not valid JSON.
pub const INVALID_JSON: &str = "Invalid JSON format";

const READ_BUFFER_SIZE: usize = 4096;

/// TCP endpoint serving one client at a time.
pub struct Server<S> {
    listener: TcpListener,
    config: ServerConfig,
    source: S,
}

impl<S: StateSource> Server<S> {
    /// Bind to `config.bind`.
    ///
    /// # Errors
    ///
    /// [`ServerError::Io`] if the address cannot be bound.
    pub async fn bind(config: ServerConfig, source: S) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind).await?;
        Ok(Self { listener, config, source })
    }

    /// The address actually bound, useful with port 0.
    ///
    /// # Errors
    ///
    /// [`ServerError::Io`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// The state source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Serve clients one after another, forever.
    ///
    /// A failing client is logged and the next one is accepted.
    ///
    /// # Errors
    ///
    /// [`ServerError::Io`] if accepting fails.
    pub async fn run(mut self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr()?, "listening");
        loop {
            self.serve_one().await?;
        }
    }

    /// Accept one client and serve it until it leaves.
    ///
    /// # Errors
    ///
    /// [`ServerError::Io`] if accepting fails. Errors on the client's stream
    /// are logged, not returned.
    pub async fn serve_one(&mut self) -> Result<(), ServerError> {
        let (stream, peer) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "could not disable Nagle");
        }
        info!(%peer, "client connected");

        match serve(stream, &self.config, &mut self.source).await {
            Ok(()) => info!(%peer, "client disconnected"),
            Err(e) => warn!(%peer, error = %e, "client dropped"),
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for Server<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Run the protocol on one stream until the client closes it.
///
/// # Errors
///
/// Any read or write failure, or a line longer than the framing limit.
pub async fn serve<T, S>(stream: T, config: &ServerConfig, source: &mut S) -> Result<(), ServerError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: StateSource + ?Sized,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let welcome = Welcome { message: config.greeting.clone(), version: config.version.clone() };
    send(&mut writer, &ProtocolMessage::Welcome(welcome)).await?;

    let broadcasting = !config.broadcast_interval.is_zero();
    let mut ticker = tokio::time::interval(config.broadcast_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    let mut lines = LineBuffer::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            now = ticker.tick(), if broadcasting => {
                source.advance(now.saturating_duration_since(last_tick));
                last_tick = now;
                send(&mut writer, &ProtocolMessage::State(source.snapshot())).await?;
            },

            read = reader.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    return Ok(());
                }
                lines.push(&buf[..n])?;
                while let Some(line) = lines.next_line() {
                    if let Some(reply) = respond(&line, source) {
                        send(&mut writer, &reply).await?;
                    }
                }
            },
        }
    }
}

/// Reply to one received line. `None` for blank lines.
///
/// Controls are clamped before they reach `source`.
pub fn respond<S: StateSource + ?Sized>(line: &[u8], source: &mut S) -> Option<ProtocolMessage> {
    let message = match decode_bytes(line) {
        Ok(Some(message)) => message,
        Ok(None) => return None,
        Err(CodecError::MissingType) => return Some(error(UNKNOWN_TYPE)),
        Err(e) => {
            warn!(error = %e, "rejecting malformed frame");
            return Some(error(INVALID_JSON));
        },
    };

    match message {
        ProtocolMessage::Control(command) => {
            let command = command.clamped();
            debug!(?command, "applying controls");
            source.apply_controls(command);
            Some(ProtocolMessage::Ack(Ack { message: Some(CONTROL_ACK.to_string()) }))
        },
        ProtocolMessage::Query(query) if query.command == GET_STATE_COMMAND => {
            Some(ProtocolMessage::State(source.snapshot()))
        },
        ProtocolMessage::Query(query) => {
            warn!(command = %query.command, "unknown query command");
            Some(error(UNKNOWN_QUERY))
        },
        other => {
            warn!(kind = other.kind(), "unexpected message type");
            Some(error(UNKNOWN_TYPE))
        },
    }
}

fn error(message: &str) -> ProtocolMessage {
    ProtocolMessage::Error(ErrorMessage { message: message.to_string() })
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, message: &ProtocolMessage) -> Result<(), ServerError> {
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use flightlink_proto::{ControlCommand, Query};

    use super::*;
    use crate::source::HoldStateSource;

    fn reply(line: &str) -> Option<ProtocolMessage> {
        respond(line.as_bytes(), &mut HoldStateSource::cruise())
    }

    fn error_text(message: Option<ProtocolMessage>) -> String {
        match message {
            Some(ProtocolMessage::Error(e)) => e.message,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn control_is_clamped_applied_and_acked() {
        let mut source = HoldStateSource::cruise();
        let line = encode(&ProtocolMessage::Control(ControlCommand::new(1.5, -2.0, 0.2, 0.0))).unwrap();

        let reply = respond(&line, &mut source);
        assert_eq!(reply, Some(ProtocolMessage::Ack(Ack { message: Some(CONTROL_ACK.into()) })));
        assert_eq!(source.snapshot().controls, ControlCommand::new(1.0, -1.0, 0.2, 0.0));
    }

    #[test]
    fn partial_control_defaults_missing_fields() {
        let mut source = HoldStateSource::cruise();
        respond(br#"{"type":"control","throttle":0.3}"#, &mut source);
        assert_eq!(source.snapshot().controls, ControlCommand::new(0.3, 0.0, 0.0, 0.0));
    }

    #[test]
    fn get_state_query_returns_state() {
        let line = encode(&ProtocolMessage::Query(Query::get_state())).unwrap();
        let reply = respond(&line, &mut HoldStateSource::cruise());
        assert!(matches!(reply, Some(ProtocolMessage::State(s)) if s.altitude == 1000.0));
    }

    #[test]
    fn error_replies() {
        assert_eq!(error_text(reply(r#"{"type":"query","command":"getFuel"}"#)), UNKNOWN_QUERY);
        assert_eq!(error_text(reply(r#"{"type":"telemetry"}"#)), UNKNOWN_TYPE);
        assert_eq!(error_text(reply(r#"{"type":"welcome","message":"hi","version":"1"}"#)), UNKNOWN_TYPE);
        assert_eq!(error_text(reply(r#"{"throttle":1.0}"#)), UNKNOWN_TYPE);
        assert_eq!(error_text(reply("not json")), INVALID_JSON);
    }

    #[test]
    fn blank_lines_get_no_reply() {
        assert_eq!(reply(""), None);
        assert_eq!(reply("  \r"), None);
    }

    #[tokio::test]
    async fn serve_greets_and_answers() {
        let (client, server) = tokio::io::duplex(4096);
        let config = ServerConfig { broadcast_interval: Duration::ZERO, ..ServerConfig::local() };
        let task = tokio::spawn(async move {
            let mut source = HoldStateSource::cruise();
            serve(server, &config, &mut source).await
        });

        let (mut reader, mut writer) = tokio::io::split(client);
        writer.write_all(b"{\"type\":\"query\",\"command\":\"getState\"}\n").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.unwrap();
        task.await.unwrap().unwrap();

        let text = String::from_utf8(received).unwrap();
        let kinds: Vec<String> = text
            .lines()
            .map(|line| flightlink_proto::decode(line).unwrap().unwrap().kind().to_owned())
            .collect();
        assert_eq!(kinds, ["welcome", "state"]);
    }
}
