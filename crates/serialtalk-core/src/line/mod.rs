//! Serial line configuration.
//!
//! # What is a "line configuration"? (for beginners)
//!
//! A UART has no built-in idea of how fast bits arrive or how they are grouped.
//! Both ends must agree on:
//!
//! - the **baud rate** (bits per second, e.g. 9600 or 115200),
//! - the **character size** (5 to 8 data bits),
//! - the **parity** bit (none, odd, even),
//!
//! and optionally drive the **modem control lines** (DTR, RTS, ...) that many
//! boards use for reset or boot-mode selection.
//!
//! The types here describe that agreement without touching a device.  The
//! `serialtalk` crate turns a [`config::LinePlan`] into `termios` settings.

pub mod baud;
pub mod config;
pub mod modem;
