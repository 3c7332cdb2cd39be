//! The public session facade.

use std::{sync::Arc, time::Duration};

use flightlink_proto::{ControlCommand, LineBuffer, StateSnapshot, Welcome};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    cache::CallbackError,
    config::SessionConfig,
    connection::{SessionStatus, Shared, read_welcome},
    dispatch::Dispatcher,
    error::{ConnectError, HandshakeError, SendError},
    policy::ControlPolicy,
    receiver,
    transport::{TcpTransport, Transport},
};

/// A live connection to a flight simulator.
///
/// Cheap to clone; clones share the connection. The receive task stops when
/// [`Session::disconnect`] is called or the last clone is dropped.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use flightlink_client::{Session, SessionConfig};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::connect("localhost", 9090, SessionConfig::default()).await?;
/// if let Some(state) = session.wait_for_state(Duration::from_secs(5)).await {
///     tracing::info!(altitude = state.altitude, "first state");
/// }
/// session.send_controls(0.75, 0.1, 0.0, 0.0).await?;
/// session.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    receiver: Mutex<Option<JoinHandle<()>>>,
    peer: Option<String>,
    welcome: Welcome,
    config: SessionConfig,
}

impl Session {
    /// Connect over TCP and complete the welcome handshake.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::ConnectionRefused`] if nothing listens at the endpoint
    /// - [`ConnectError::ConnectTimeout`] if `config.connect_timeout` elapses
    /// - [`ConnectError::Handshake`] if no valid welcome arrives in time
    /// - [`ConnectError::Io`] for any other socket failure
    pub async fn connect(host: &str, port: u16, config: SessionConfig) -> Result<Self, ConnectError> {
        Self::connect_with(&TcpTransport, host, port, config).await
    }

    /// Connect through a custom [`Transport`].
    ///
    /// # Errors
    ///
    /// Same as [`Session::connect`].
    pub async fn connect_with<T: Transport>(
        transport: &T,
        host: &str,
        port: u16,
        config: SessionConfig,
    ) -> Result<Self, ConnectError> {
        let endpoint = format!("{host}:{port}");
        debug!(%endpoint, "connecting");

        let opened = match config.connect_timeout {
            Some(limit) => timeout(limit, transport.connect(host, port))
                .await
                .map_err(|_| ConnectError::ConnectTimeout { endpoint: endpoint.clone() })?,
            None => transport.connect(host, port).await,
        };
        let stream = opened.map_err(|e| ConnectError::from_io(endpoint.clone(), e))?;

        Self::establish(stream, Some(endpoint), config).await
    }

    /// Run the handshake over an already-open stream.
    ///
    /// # Errors
    ///
    /// [`ConnectError::Handshake`] if no valid welcome arrives in time.
    pub async fn from_stream<S>(stream: S, config: SessionConfig) -> Result<Self, ConnectError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::establish(stream, None, config).await
    }

    async fn establish<S>(stream: S, peer: Option<String>, config: SessionConfig) -> Result<Self, ConnectError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let shared = Arc::new(Shared::new());
        let (mut reader, writer) = tokio::io::split(stream);
        let mut lines = LineBuffer::with_max_line_length(config.max_line_length);

        let handshake = timeout(
            config.handshake_timeout,
            read_welcome(&mut reader, &mut lines, config.read_buffer_size),
        )
        .await
        .unwrap_or_else(|_| Err(HandshakeError::Timeout(config.handshake_timeout)));

        let welcome = match handshake {
            Ok(welcome) => welcome,
            Err(e) => {
                shared.mark_disconnected();
                warn!(peer = ?peer, error = %e, "handshake failed");
                return Err(e.into());
            },
        };

        shared.status.establish();
        info!(
            peer = ?peer,
            greeting = %welcome.message,
            version = %welcome.version,
            "connected to simulator"
        );

        let dispatcher = Dispatcher::new(Box::new(writer), Arc::clone(&shared));
        let task = tokio::spawn(receiver::run(reader, lines, Arc::clone(&shared), config.read_buffer_size));

        Ok(Self {
            inner: Arc::new(SessionInner {
                shared,
                dispatcher,
                receiver: Mutex::new(Some(task)),
                peer,
                welcome,
                config,
            }),
        })
    }

    /// Close the session.
    ///
    /// Stops the receive task (aborting it after `shutdown_timeout`), shuts
    /// down the write half and clears the state callback. A send blocked on
    /// a full socket is abandoned with [`SendError::NotConnected`].
    /// Idempotent.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        let was_connected = inner.shared.status.begin_close();
        inner.shared.request_stop();

        let task = inner.receiver.lock().await.take();
        if let Some(mut task) = task {
            match timeout(inner.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => warn!(error = %e, "receive task failed"),
                Err(_) => {
                    warn!(timeout = ?inner.config.shutdown_timeout, "receive task did not stop, aborting");
                    task.abort();
                },
            }
        }

        inner.dispatcher.close(inner.config.shutdown_timeout).await;
        inner.shared.callback.clear();
        inner.shared.status.set(SessionStatus::Disconnected);

        if was_connected {
            info!(peer = ?inner.peer, "disconnected");
        }
    }

    /// Send a control tuple. Out-of-range values are clamped silently.
    ///
    /// # Errors
    ///
    /// [`SendError::NotConnected`] or [`SendError::Io`]. An I/O failure
    /// leaves the session disconnected.
    pub async fn send_controls(&self, throttle: f64, elevator: f64, aileron: f64, rudder: f64) -> Result<(), SendError> {
        self.send_command(ControlCommand::new(throttle, elevator, aileron, rudder)).await.map(|_| ())
    }

    /// Send a control command, returning the clamped values that went out.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_controls`].
    pub async fn send_command(&self, command: ControlCommand) -> Result<ControlCommand, SendError> {
        self.inner.dispatcher.send_control(command).await
    }

    /// Ask the simulator for a fresh state frame. The reply lands in the
    /// cache like any other state.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_controls`].
    pub async fn query_state(&self) -> Result<(), SendError> {
        self.inner.dispatcher.send_query().await
    }

    /// Newest cached snapshot.
    pub fn latest_state(&self) -> Option<Arc<StateSnapshot>> {
        self.inner.shared.cache.latest()
    }

    /// Cached snapshot, waiting up to `limit` for the first one.
    ///
    /// Returns `None` on timeout, or when the session ends before any state
    /// arrived.
    pub async fn wait_for_state(&self, limit: Duration) -> Option<Arc<StateSnapshot>> {
        let shared = &self.inner.shared;
        if let Some(snapshot) = shared.cache.latest() {
            return Some(snapshot);
        }

        let wait = async {
            tokio::select! {
                snapshot = shared.cache.first() => Some(snapshot),
                () = shared.stopped() => shared.cache.latest(),
            }
        };
        timeout(limit, wait).await.ok().flatten()
    }

    /// First snapshot processed after this call, waiting up to `limit`.
    pub async fn wait_for_next_state(&self, limit: Duration) -> Option<Arc<StateSnapshot>> {
        let shared = &self.inner.shared;
        let mut updates = shared.cache.subscribe();

        let wait = async {
            tokio::select! {
                changed = updates.changed() => match changed {
                    Ok(()) => updates.borrow_and_update().clone(),
                    Err(_) => None,
                },
                () = shared.stopped() => None,
            }
        };
        timeout(limit, wait).await.ok().flatten()
    }

    /// Register the state callback, replacing any previous one.
    ///
    /// The callback runs on the receive task after the cache is updated. It
    /// must not block; errors and panics are logged and swallowed.
    pub fn set_state_callback<F>(&self, callback: F)
    where
        F: Fn(&StateSnapshot) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.inner.shared.callback.set(Arc::new(callback));
    }

    /// Remove the state callback.
    pub fn clear_state_callback(&self) {
        self.inner.shared.callback.clear();
    }

    /// Ask `policy` for a command based on the latest state and send it.
    ///
    /// Returns the command sent, or `None` if no state has arrived yet.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_controls`].
    pub async fn apply_policy<P>(&self, policy: &mut P) -> Result<Option<ControlCommand>, SendError>
    where
        P: ControlPolicy + ?Sized,
    {
        let Some(state) = self.latest_state() else {
            return Ok(None);
        };
        let command = policy.decide(&state);
        self.send_command(command).await.map(Some)
    }

    /// Whether the session is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.shared.status.is_connected()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.inner.shared.status.get()
    }

    /// `host:port` the session was opened to, if it was opened by address.
    pub fn peer(&self) -> Option<&str> {
        self.inner.peer.as_deref()
    }

    /// The server's welcome frame.
    pub fn server_info(&self) -> &Welcome {
        &self.inner.welcome
    }

    /// Configuration the session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.shared.request_stop();
    }
}
