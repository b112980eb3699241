//! Network infrastructure: the TCP listen mode.

pub mod listener;

pub use listener::{bind, classify_accept_error, serve, AcceptFailure, NetworkError};
