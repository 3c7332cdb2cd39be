//! Command-line tools for driving a flightlink simulator.
//!
//! The binaries are thin: argument structs and the work they do live here so
//! they can be tested without spawning processes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod monitor;
