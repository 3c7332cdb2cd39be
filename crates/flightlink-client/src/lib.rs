//! Client-side session manager for the flightlink protocol.
//!
//! A [`Session`] is one live TCP connection to a flight simulator. It keeps
//! two paths apart:
//!
//! - **Receive path**: a background tokio task reads the socket, reassembles
//!   newline-delimited frames and routes them. `state` frames replace the
//!   snapshot in the [`StateCache`] and fire the registered callback.
//! - **Command path**: foreground callers send `control` and `query` frames
//!   through a write-locked dispatcher. They never read the socket; replies
//!   show up asynchronously in the cache.
//!
//! # Architecture
//!
//! ```text
//!            connect()                      ┌──────────────┐
//!  caller ─────────────> handshake ───────> │ receive task │──┐
//!    │                   (welcome)          └──────────────┘  │ replace
//!    │ send_controls()                                         ▼
//!    │ query_state()    ┌────────────┐  write   ┌─────────────────────┐
//!    ├─────────────────>│ dispatcher │────────> │ socket              │
//!    │                  └────────────┘          └─────────────────────┘
//!    │ latest_state()   ┌────────────┐
//!    └─────────────────>│ StateCache │  (single writer, many readers)
//!                       └────────────┘
//! ```
//!
//! # Components
//!
//! - [`transport`]: how the byte stream is opened (TCP in production)
//! - [`connection`]: status state machine and the welcome handshake
//! - [`cache`]: latest-snapshot cell and the state callback slot
//! - [`receiver`]: the receive loop
//! - [`dispatch`]: serialized outbound writes
//! - [`session`]: the public facade
//! - [`policy`]: hook for controllers that turn snapshots into commands
//! - [`config`] and [`error`]

pub mod cache;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod policy;
pub mod receiver;
pub mod session;
pub mod transport;

pub use cache::{CallbackError, StateCache, StateCallback};
pub use config::SessionConfig;
pub use connection::SessionStatus;
pub use error::{ConnectError, HandshakeError, SendError};
pub use flightlink_proto::{ControlCommand, StateSnapshot, Welcome};
pub use policy::{ConstantPolicy, ControlPolicy};
pub use session::Session;
pub use transport::{TcpTransport, Transport};
