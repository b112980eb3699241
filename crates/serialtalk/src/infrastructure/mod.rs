//! Infrastructure layer for serialtalk.
//!
//! The infrastructure layer handles all I/O: the serial tty, the peer
//! descriptors, the TCP listener, the stdin terminal mode and the trace
//! output.
//!
//! # Responsibilities
//!
//! - Opening and configuring the serial device (`termios`, ioctls)
//! - Multiplexing serial line and peer with `poll(2)`
//! - Accepting TCP peers one at a time in listen mode
//! - Switching stdin to non-canonical / no-echo mode and back
//! - Detaching into the background
//! - Writing byte traces and line-state snapshots
//! - Loading the optional TOML defaults file
//!
//! # What does NOT belong here?
//!
//! - Translation and session-ending rules (those are in `serialtalk-core`)
//! - The order in which the line is configured (application layer)
//! - Command-line parsing (that is done in `main.rs`)

pub mod daemon;
pub mod network;
pub mod peer;
pub mod relay_port;
pub mod serial;
pub mod storage;
pub mod terminal;
pub mod trace;

pub use peer::Peer;
pub use relay_port::PollPort;
pub use serial::SerialDevice;
pub use trace::StderrTrace;
