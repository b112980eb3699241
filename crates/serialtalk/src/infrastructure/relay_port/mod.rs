//! Implementations of [`crate::application::transfer::RelayPort`].
//!
//! - [`PollPort`]: a real serial device and peer, multiplexed with `poll(2)`.
//! - [`mock::MockRelayPort`]: a scripted port for unit tests.

pub mod mock;
pub mod poll;

pub use poll::PollPort;
