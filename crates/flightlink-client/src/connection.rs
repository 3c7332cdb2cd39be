//! Connection lifecycle: status tracking and the welcome handshake.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐ welcome ┌───────────┐
//! │ Disconnected │────────>│ Connecting │────────>│ Connected │
//! └──────────────┘         └────────────┘         └───────────┘
//!        ^                       │ refused/timeout/     │    │ disconnect()
//!        │                       │ bad handshake        │    ↓
//!        │                       │      peer close/     │ ┌─────────┐
//!        └───────────────────────┴──────I/O error───────┘ │ Closing │
//!        ^                                                └─────────┘
//!        └─────────────────────────────────────────────────────┘
//! ```
//!
//! There is no reconnecting state. A caller that wants to reconnect opens a
//! fresh session.
//!
//! The status is an atomic so the receive task, the dispatcher and any
//! number of foreground readers can observe and update it without a lock.

use std::sync::atomic::{AtomicU8, Ordering};

use flightlink_proto::{LineBuffer, ProtocolMessage, Welcome, decode_bytes};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::watch,
};

use crate::{
    cache::{CallbackSlot, StateCache},
    error::HandshakeError,
};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionStatus {
    /// No live connection.
    Disconnected = 0,
    /// Stream opening or handshake in progress.
    Connecting = 1,
    /// Handshake complete, receive task running.
    Connected = 2,
    /// `disconnect()` in progress.
    Closing = 3,
}

impl SessionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            _ => Self::Disconnected,
        }
    }
}

/// Atomic holder for [`SessionStatus`].
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new(status: SessionStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn get(&self) -> SessionStatus {
        SessionStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: SessionStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.get() == SessionStatus::Connected
    }

    /// `Connected -> Closing`. Returns whether this call made the transition.
    pub(crate) fn begin_close(&self) -> bool {
        self.transition(SessionStatus::Connected, SessionStatus::Closing)
    }

    /// `Connecting -> Connected`.
    pub(crate) fn establish(&self) -> bool {
        self.transition(SessionStatus::Connecting, SessionStatus::Connected)
    }

    /// Move to `Disconnected` from any state, returning the previous one.
    pub(crate) fn drop_connection(&self) -> SessionStatus {
        SessionStatus::from_u8(self.0.swap(SessionStatus::Disconnected as u8, Ordering::AcqRel))
    }

    fn transition(&self, from: SessionStatus, to: SessionStatus) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// State shared between the session facade, the receive task and the
/// dispatcher.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) status: StatusCell,
    pub(crate) cache: StateCache,
    pub(crate) callback: CallbackSlot,
    /// Flips to `true` once, when the session is told to stop or has ended.
    stop: watch::Sender<bool>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (stop, _rx) = watch::channel(false);
        Self {
            status: StatusCell::new(SessionStatus::Connecting),
            cache: StateCache::new(),
            callback: CallbackSlot::default(),
            stop,
        }
    }

    pub(crate) fn request_stop(&self) {
        self.stop.send_replace(true);
    }

    pub(crate) fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once the session has been told to stop or has dropped.
    pub(crate) async fn stopped(&self) {
        let mut rx = self.stop_signal();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Mark the connection lost. Returns the status it was in before.
    pub(crate) fn mark_disconnected(&self) -> SessionStatus {
        let previous = self.status.drop_connection();
        self.request_stop();
        previous
    }
}

/// Read frames until the server's `welcome` arrives.
///
/// Blank lines are skipped. Any other first message fails the handshake.
/// Bytes that follow the welcome in the same read stay in `lines` so the
/// receive task can pick them up.
pub(crate) async fn read_welcome<R>(
    reader: &mut R,
    lines: &mut LineBuffer,
    read_buffer_size: usize,
) -> Result<Welcome, HandshakeError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_buffer_size.max(1)];
    loop {
        while let Some(line) = lines.next_line() {
            match decode_bytes(&line)? {
                Some(ProtocolMessage::Welcome(welcome)) => return Ok(welcome),
                Some(other) => {
                    return Err(HandshakeError::UnexpectedMessage { kind: other.kind().to_owned() });
                },
                None => {},
            }
        }

        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(HandshakeError::Closed);
        }
        lines.push(&buf[..n])?;
    }
}
