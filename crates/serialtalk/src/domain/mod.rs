//! Domain layer for serialtalk.
//!
//! Plain configuration types with no I/O.  Line and translation rules live in
//! `serialtalk-core`; this module only groups them into the settings of one
//! program run.

pub mod config;

pub use config::{PeerMode, RelayConfig, RelayOptions, StdinMode};
