//! Reference flightlink simulator endpoint.
//!
//! Serves one client at a time over TCP. On accept it sends a `welcome`
//! frame, then broadcasts `state` frames on a fixed cadence while answering
//! the client's `control` and `query` frames:
//!
//! | received                        | reply                              |
//! |---------------------------------|------------------------------------|
//! | `control`                       | `ack` "Control command received"   |
//! | `query` with `getState`         | `state`                            |
//! | `query` with any other command  | `error` "Unknown query command"    |
//! | any other `type`, or none       | `error` "Unknown message type"     |
//! | invalid JSON                    | `error` "Invalid JSON format"      |
//! | empty line                      | nothing                            |
//!
//! The server has no flight dynamics. State comes from a [`StateSource`],
//! which the caller can back with a real model.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod source;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{Server, respond};
pub use source::{HoldStateSource, StateSource};
