//! Background receive loop.
//!
//! One task per session owns the read half of the stream. It reassembles
//! frames, decodes them and routes each message:
//!
//! | message   | action                                          |
//! |-----------|-------------------------------------------------|
//! | `state`   | replace the cached snapshot, invoke callback    |
//! | `ack`     | debug log                                       |
//! | `error`   | warn log, session stays up                      |
//! | other     | warn log, ignored                               |
//!
//! A line that fails to decode is logged and dropped; the next line is
//! processed normally. The loop ends on peer close, a fatal read error, an
//! unterminated line longer than the configured limit, or a stop request.
//! On every exit the session is marked disconnected.

use std::{io, sync::Arc};

use flightlink_proto::{CodecError, LineBuffer, ProtocolMessage, decode_bytes};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, warn};

use crate::connection::Shared;

/// Why the receive loop ended.
#[derive(Debug)]
enum Exit {
    Stopped,
    PeerClosed,
    Io(io::Error),
    Framing(CodecError),
}

/// Run the receive loop until the stream ends or a stop is requested.
///
/// `lines` may already hold bytes that arrived with the welcome frame.
pub(crate) async fn run<R>(mut reader: R, mut lines: LineBuffer, shared: Arc<Shared>, read_buffer_size: usize)
where
    R: AsyncRead + Unpin + Send,
{
    let exit = receive(&mut reader, &mut lines, &shared, read_buffer_size).await;
    let previous = shared.mark_disconnected();
    // No more states will arrive; drop the callback and whatever it captured.
    shared.callback.clear();

    match exit {
        Exit::Stopped => debug!(?previous, "receive loop stopped"),
        Exit::PeerClosed => info!(?previous, "server closed the connection"),
        Exit::Io(e) => error!(error = %e, "read failed, session disconnected"),
        Exit::Framing(e) => error!(error = %e, "stream desynchronized, session disconnected"),
    }
}

async fn receive<R>(reader: &mut R, lines: &mut LineBuffer, shared: &Shared, read_buffer_size: usize) -> Exit
where
    R: AsyncRead + Unpin,
{
    let mut stop = shared.stop_signal();
    if *stop.borrow_and_update() {
        return Exit::Stopped;
    }

    process_lines(lines, shared);

    let mut buf = vec![0u8; read_buffer_size.max(1)];
    loop {
        tokio::select! {
            biased;

            _ = stop.changed() => return Exit::Stopped,

            read = reader.read(&mut buf) => match read {
                Ok(0) => return Exit::PeerClosed,
                Ok(n) => {
                    if let Err(e) = lines.push(&buf[..n]) {
                        return Exit::Framing(e);
                    }
                    process_lines(lines, shared);
                },
                Err(e) if is_transient(&e) => {
                    debug!(error = %e, "transient read error, retrying");
                },
                Err(e) => return Exit::Io(e),
            },
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Decode and route every complete line currently buffered.
pub(crate) fn process_lines(lines: &mut LineBuffer, shared: &Shared) {
    while let Some(line) = lines.next_line() {
        match decode_bytes(&line) {
            Ok(Some(message)) => handle_message(message, shared),
            Ok(None) => {},
            Err(e) => warn!(
                error = %e,
                line = %String::from_utf8_lossy(&line),
                "dropping undecodable frame"
            ),
        }
    }
}

pub(crate) fn handle_message(message: ProtocolMessage, shared: &Shared) {
    match message {
        ProtocolMessage::State(snapshot) => {
            let snapshot = shared.cache.replace(snapshot);
            shared.callback.invoke(&snapshot);
        },
        ProtocolMessage::Ack(ack) => debug!(detail = ?ack.message, "control acknowledged"),
        ProtocolMessage::Error(err) => warn!(reason = %err.message, "server reported an error"),
        ProtocolMessage::Unknown { kind } => warn!(%kind, "ignoring unknown message type"),
        other => warn!(kind = other.kind(), "ignoring unexpected message"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use flightlink_proto::{Ack, ErrorMessage, StateSnapshot, Welcome};

    use super::*;
    use crate::connection::SessionStatus;

    fn connected() -> Shared {
        let shared = Shared::new();
        shared.status.set(SessionStatus::Connected);
        shared
    }

    fn state_line(time: f64) -> Vec<u8> {
        flightlink_proto::encode(&ProtocolMessage::State(StateSnapshot { time, ..Default::default() })).unwrap()
    }

    #[test]
    fn state_replaces_cache_and_fires_callback() {
        let shared = connected();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        shared.callback.set(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        handle_message(ProtocolMessage::State(StateSnapshot { time: 1.5, ..Default::default() }), &shared);

        assert_eq!(shared.cache.latest().unwrap().time, 1.5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_state_messages_leave_cache_untouched() {
        let shared = connected();
        handle_message(ProtocolMessage::Ack(Ack::default()), &shared);
        handle_message(ProtocolMessage::Error(ErrorMessage { message: "bad".into() }), &shared);
        handle_message(ProtocolMessage::Welcome(Welcome::default()), &shared);
        handle_message(ProtocolMessage::Unknown { kind: "telemetry".into() }, &shared);

        assert!(shared.cache.latest().is_none());
        assert!(shared.status.is_connected());
    }

    #[test]
    fn bad_line_does_not_stop_later_lines() {
        let shared = connected();
        let mut lines = LineBuffer::new();
        let mut bytes = b"{not json\n".to_vec();
        bytes.extend(state_line(7.0));
        lines.push(&bytes).unwrap();

        process_lines(&mut lines, &shared);
        assert_eq!(shared.cache.latest().unwrap().time, 7.0);
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn peer_close_marks_disconnected() {
        let (server, client) = tokio::io::duplex(1024);
        let shared = Arc::new(connected());
        drop(server);

        run(client, LineBuffer::new(), Arc::clone(&shared), 64).await;
        assert_eq!(shared.status.get(), SessionStatus::Disconnected);
        assert!(shared.is_stopped());
    }

    #[tokio::test]
    async fn leftover_lines_are_processed_first() {
        let (server, client) = tokio::io::duplex(1024);
        let shared = Arc::new(connected());
        let mut lines = LineBuffer::new();
        lines.push(&state_line(3.0)).unwrap();
        drop(server);

        run(client, lines, Arc::clone(&shared), 64).await;
        assert_eq!(shared.cache.latest().unwrap().time, 3.0);
    }

    #[tokio::test]
    async fn oversized_line_drops_session() {
        let (mut server, client) = tokio::io::duplex(4096);
        let shared = Arc::new(connected());
        let task = tokio::spawn(run(client, LineBuffer::with_max_line_length(16), Arc::clone(&shared), 64));

        tokio::io::AsyncWriteExt::write_all(&mut server, &[b'x'; 64]).await.unwrap();
        task.await.unwrap();
        assert_eq!(shared.status.get(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn stop_request_ends_loop() {
        let (_server, client) = tokio::io::duplex(1024);
        let shared = Arc::new(connected());
        let task = tokio::spawn(run(client, LineBuffer::new(), Arc::clone(&shared), 64));

        shared.request_stop();
        tokio::time::timeout(std::time::Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(shared.status.get(), SessionStatus::Disconnected);
    }
}
