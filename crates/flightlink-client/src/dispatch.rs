//! Outbound command path.
//!
//! Every frame is written under one async lock, so concurrent senders never
//! interleave bytes on the wire. The dispatcher never reads; replies reach
//! the caller through the state cache.

use std::{sync::Arc, time::Duration};

use flightlink_proto::{ControlCommand, ProtocolMessage, Query, encode};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
    time::timeout,
};
use tracing::{debug, error, warn};

use crate::{connection::Shared, error::SendError};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Write half of a session.
pub(crate) struct Dispatcher {
    writer: Mutex<Option<Writer>>,
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub(crate) fn new(writer: Writer, shared: Arc<Shared>) -> Self {
        Self { writer: Mutex::new(Some(writer)), shared }
    }

    /// Clamp and send a control tuple.
    pub(crate) async fn send_control(&self, command: ControlCommand) -> Result<ControlCommand, SendError> {
        let clamped = command.clamped();
        if clamped != command {
            debug!(?command, ?clamped, "control values clamped");
        }
        self.send(&ProtocolMessage::Control(clamped)).await?;
        Ok(clamped)
    }

    /// Ask the server for a fresh state frame.
    pub(crate) async fn send_query(&self) -> Result<(), SendError> {
        self.send(&ProtocolMessage::Query(Query::get_state())).await
    }

    /// Encode and write one frame.
    ///
    /// A write failure marks the session disconnected and stops the
    /// receive task.
    pub(crate) async fn send(&self, message: &ProtocolMessage) -> Result<(), SendError> {
        if !self.shared.status.is_connected() {
            return Err(SendError::NotConnected);
        }

        let frame = encode(message)?;

        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(SendError::NotConnected);
        };

        // A stop abandons a write stuck on a full socket. The frame may be
        // half written, so the writer is dropped.
        let result = tokio::select! {
            biased;
            () = self.shared.stopped() => None,
            result = async {
                writer.write_all(&frame).await?;
                writer.flush().await
            } => Some(result),
        };

        match result {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => {
                error!(error = %e, kind = message.kind(), "write failed, session disconnected");
                guard.take();
                self.shared.mark_disconnected();
                Err(SendError::Io(e))
            },
            None => {
                debug!(kind = message.kind(), "session stopping, write abandoned");
                guard.take();
                Err(SendError::NotConnected)
            },
        }
    }

    /// Release the write half, shutting down our side of the stream.
    ///
    /// Waits at most `limit` for an in-flight send and again for the
    /// shutdown itself.
    pub(crate) async fn close(&self, limit: Duration) {
        let Ok(mut guard) = timeout(limit, self.writer.lock()).await else {
            warn!(timeout = ?limit, "write half still busy, leaving it to the sender");
            return;
        };
        let writer = guard.take();
        drop(guard);

        if let Some(mut writer) = writer {
            match timeout(limit, writer.shutdown()).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => warn!(error = %e, "error shutting down write half"),
                Err(_) => warn!(timeout = ?limit, "write half shutdown timed out, dropping it"),
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
