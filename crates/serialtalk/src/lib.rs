//! serialtalk library crate.
//!
//! Relays bytes between a serial device and one peer: the terminal that
//! started the program, or a single TCP connection at a time.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Terminal (stdin/stdout)  or  TCP client
//!         ↕
//! [serialtalk]
//!   ├── domain/           RelayConfig, PeerMode, StdinMode
//!   ├── application/      Line configuration and the transfer loop
//!   └── infrastructure/
//!         ├── serial/     tty open, termios, modem-line ioctls
//!         ├── relay_port/ poll(2) multiplexing (and a scripted mock)
//!         ├── network/    TCP listen mode
//!         ├── trace       timestamped byte traces on stderr
//!         └── storage/    optional TOML defaults file
//!         ↕
//! Serial device (/dev/ttyS0, /dev/ttyUSB0, ...)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `serialtalk-core` only, and reaches
//!   the outside world through traits.
//! - `infrastructure` implements those traits with `nix` and `std::net`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: line configuration and the transfer loop.
pub mod application;

/// Infrastructure layer: serial device, peers, listener, traces.
pub mod infrastructure;
