//! Application layer for serialtalk.
//!
//! Contains the use cases that orchestrate the relay:
//! - [`configure_line`]: turn a [`serialtalk_core::LineConfig`] into driver
//!   calls in the right order.
//! - [`transfer`]: the readiness loop that moves bytes both ways.
//! - [`interrupt`]: the one-shot ctrl-c mode.
//!
//! The use cases only talk to the outside world through the
//! [`configure_line::LineControl`], [`transfer::RelayPort`] and
//! [`transfer::RelayObserver`] traits.

pub mod configure_line;
pub mod interrupt;
pub mod transfer;

pub use configure_line::{ConfigureError, ConfigureLineUseCase, ConfiguredLine, LineControl};
pub use interrupt::{send_interrupt, INTERRUPT_BYTE};
pub use transfer::{
    EndReason, Readiness, RelayError, RelayObserver, RelayPort, SessionSummary, TransferLoop,
};
