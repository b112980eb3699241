//! The transfer loop: moves bytes between the serial line and the peer.
//!
//! # How one iteration works (for beginners)
//!
//! 1. Block in [`RelayPort::wait`] until the serial line or the peer has
//!    something to report, or until the session timeout elapses.
//! 2. If nothing happened, tell the [`SessionState`] about the idle wait.
//!    With status snapshots enabled, the modem lines are reported here.
//! 3. Service the serial side first: report an error condition, then move at
//!    most **one** byte from the serial line to the peer.  A hung-up device
//!    (or end-of-file on it) ends the session whatever the timeout.
//! 4. Service the peer side: move at most one byte from the peer to the
//!    serial line, applying the outbound newline rewriting.
//! 5. If the peer hung up without sending data, end or half-close the
//!    session.
//!
//! Moving one byte per readiness event keeps both directions fair and lets a
//! trace line carry the exact time each byte crossed the relay.
//!
//! The loop never touches a file descriptor itself.  All I/O goes through
//! the [`RelayPort`] trait, so the whole algorithm can be unit-tested with
//! [`crate::infrastructure::relay_port::mock::MockRelayPort`].

use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

use serialtalk_core::{
    HangupOutcome, IdleOutcome, LineStateSnapshot, ModemLines, SessionState, Timeout, Timestamp,
};

use crate::domain::RelayOptions;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Fatal errors that end a relay session early.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The readiness wait itself failed (anything other than an interrupt).
    #[error("poll failed: {0}")]
    Wait(#[source] io::Error),
}

// ── Ports ─────────────────────────────────────────────────────────────────────

/// What one readiness wait observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// At least one byte can be read from the serial line.
    pub serial_readable: bool,
    /// The serial line reported an error condition, with the OS error code
    /// that describes it, or 0 when the driver gave none.
    pub serial_fault: Option<i32>,
    /// The serial line hung up (device removed, pty master closed).
    pub serial_hangup: bool,
    /// At least one byte (or end-of-file) can be read from the peer.
    pub peer_readable: bool,
    /// The peer hung up.
    pub peer_hangup: bool,
}

impl Readiness {
    /// Returns `true` if the wait timed out with no event at all.
    pub fn is_idle(&self) -> bool {
        !self.serial_readable
            && self.serial_fault.is_none()
            && !self.serial_hangup
            && !self.peer_readable
            && !self.peer_hangup
    }
}

/// The I/O surface the transfer loop drives.
///
/// The production implementation is
/// [`crate::infrastructure::relay_port::PollPort`]; tests use the scripted
/// [`crate::infrastructure::relay_port::mock::MockRelayPort`].
pub trait RelayPort {
    /// Blocks until an event arrives or `timeout` elapses.
    ///
    /// When `peer_armed` is `false` only the serial line is watched.  An
    /// [`io::ErrorKind::Interrupted`] error is retried by the caller.
    fn wait(&mut self, peer_armed: bool, timeout: Timeout) -> io::Result<Readiness>;

    /// Reads one byte from the serial line; `Ok(None)` means the device is
    /// gone (end-of-file on a hung-up tty).
    fn read_serial(&mut self) -> io::Result<Option<u8>>;

    /// Writes one byte to the serial line.
    fn write_serial(&mut self, byte: u8) -> io::Result<()>;

    /// Reads one byte from the peer; `Ok(None)` means end-of-file.
    fn read_peer(&mut self) -> io::Result<Option<u8>>;

    /// Writes one byte to the peer.
    fn write_peer(&mut self, byte: u8) -> io::Result<()>;

    /// Queries the current modem control line state.
    fn line_state(&mut self) -> io::Result<ModemLines>;
}

/// Receives everything worth reporting while the loop runs.
///
/// The production implementation writes trace lines to stderr
/// ([`crate::infrastructure::trace::StderrTrace`]).
pub trait RelayObserver {
    /// A byte arrived from the serial line.
    fn byte_received(&mut self, at: Timestamp, byte: u8);

    /// A byte was written to the serial line.
    fn byte_sent(&mut self, at: Timestamp, byte: u8);

    /// A modem-line snapshot was taken.
    fn line_state(&mut self, snapshot: LineStateSnapshot);

    /// The serial line reported an error condition.
    fn serial_fault(&mut self, at: Timestamp, error: &io::Error);
}

// ── Session result ────────────────────────────────────────────────────────────

/// Why a relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The peer hung up and no drain window applied.
    PeerHangup,
    /// The peer hung up and the idle window after it elapsed.
    DrainExpired,
    /// A zero timeout allowed exactly one pass.
    SinglePass,
    /// The serial device went away.  Nothing more can be relayed, so the
    /// caller should not start another session on it.
    SerialHangup,
}

/// Byte counters for one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Bytes written to the serial line (after translation).
    pub to_serial: u64,
    /// Bytes written to the peer (after translation).
    pub to_peer: u64,
    pub reason: EndReason,
}

// ── Transfer loop ─────────────────────────────────────────────────────────────

/// Runs relay sessions with a fixed set of [`RelayOptions`].
#[derive(Debug, Clone, Copy)]
pub struct TransferLoop {
    options: RelayOptions,
}

impl TransferLoop {
    pub fn new(options: RelayOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Relays bytes until the session ends.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Wait`] if the readiness wait fails for a reason
    /// other than a signal interruption.  Read and write failures on either
    /// side are handled inside the loop: serial failures are logged and the
    /// byte is dropped, peer failures count as a hang-up.
    pub fn run<P, O>(&self, port: &mut P, observer: &mut O) -> Result<SessionSummary, RelayError>
    where
        P: RelayPort + ?Sized,
        O: RelayObserver + ?Sized,
    {
        let mut state = SessionState::new(self.options.timeout, self.options.idle_after_close_ms);
        let mut session = Session {
            options: &self.options,
            to_serial: 0,
            to_peer: 0,
            reason: None,
        };

        debug!(timeout = ?self.options.timeout, "relay session started");

        while !state.is_terminated() {
            let readiness = match port.wait(state.peer_armed(), state.timeout()) {
                Ok(r) => r,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RelayError::Wait(e)),
            };
            let now = Timestamp::now();

            if readiness.is_idle() {
                match state.on_idle() {
                    IdleOutcome::DrainExpired => {
                        session.reason = Some(EndReason::DrainExpired);
                        break;
                    }
                    IdleOutcome::Tick => {
                        if self.options.show_state {
                            session.snapshot(port, observer);
                        }
                    }
                }
            }

            if let Some(code) = readiness.serial_fault {
                observer.serial_fault(now, &fault_error(code));
            }

            if readiness.serial_hangup && !readiness.serial_readable {
                warn!("serial line hung up");
                session.reason = Some(EndReason::SerialHangup);
                break;
            }

            if readiness.serial_readable {
                match session.serial_to_peer(port, observer, now) {
                    Ok(SerialSide::Open) => {}
                    Ok(SerialSide::Closed) => {
                        warn!("serial line reached end-of-file");
                        session.reason = Some(EndReason::SerialHangup);
                        break;
                    }
                    Err(e) => {
                        warn!("peer write failed: {e}");
                        session.hangup(&mut state);
                    }
                }
            }

            if state.peer_armed() && readiness.peer_readable {
                match port.read_peer() {
                    Ok(Some(byte)) => session.peer_to_serial(port, observer, byte),
                    Ok(None) => {
                        debug!("peer reached end of input");
                        session.hangup(&mut state);
                    }
                    Err(e) if is_retryable(&e) => {}
                    Err(e) => {
                        warn!("peer read failed: {e}");
                        session.hangup(&mut state);
                    }
                }
            }

            if state.peer_armed() && readiness.peer_hangup && !readiness.peer_readable {
                session.hangup(&mut state);
            }

            state.end_of_pass();
            if state.is_terminated() && session.reason.is_none() {
                session.reason = Some(EndReason::SinglePass);
            }
        }

        let summary = SessionSummary {
            to_serial: session.to_serial,
            to_peer: session.to_peer,
            reason: session.reason.unwrap_or(EndReason::PeerHangup),
        };
        info!(
            to_serial = summary.to_serial,
            to_peer = summary.to_peer,
            reason = ?summary.reason,
            "relay session ended"
        );
        Ok(summary)
    }
}

/// What a serial read told the loop about the device.
enum SerialSide {
    Open,
    Closed,
}

/// Per-run counters and helpers.
struct Session<'a> {
    options: &'a RelayOptions,
    to_serial: u64,
    to_peer: u64,
    reason: Option<EndReason>,
}

impl Session<'_> {
    fn hangup(&mut self, state: &mut SessionState) {
        if let HangupOutcome::Ended = state.on_peer_hangup() {
            self.reason.get_or_insert(EndReason::PeerHangup);
        }
    }

    fn snapshot<P, O>(&mut self, port: &mut P, observer: &mut O)
    where
        P: RelayPort + ?Sized,
        O: RelayObserver + ?Sized,
    {
        match port.line_state() {
            Ok(lines) => observer.line_state(LineStateSnapshot {
                at: Timestamp::now(),
                lines,
            }),
            Err(e) => warn!("can't query modem lines: {e}"),
        }
    }

    /// Moves one byte from the serial line to the peer.
    ///
    /// Only a failed peer write is returned; serial read failures are logged.
    fn serial_to_peer<P, O>(
        &mut self,
        port: &mut P,
        observer: &mut O,
        now: Timestamp,
    ) -> io::Result<SerialSide>
    where
        P: RelayPort + ?Sized,
        O: RelayObserver + ?Sized,
    {
        let byte = match port.read_serial() {
            Ok(Some(byte)) => byte,
            Ok(None) => return Ok(SerialSide::Closed),
            Err(e) if is_retryable(&e) => return Ok(SerialSide::Open),
            Err(e) => {
                warn!("serial read failed: {e}");
                return Ok(SerialSide::Open);
            }
        };

        if self.options.trace_bytes {
            observer.byte_received(now, byte);
        }
        for &out in &self.options.translation.inbound(byte) {
            port.write_peer(out)?;
            self.to_peer += 1;
        }
        Ok(SerialSide::Open)
    }

    /// Moves one byte from the peer to the serial line.
    fn peer_to_serial<P, O>(&mut self, port: &mut P, observer: &mut O, byte: u8)
    where
        P: RelayPort + ?Sized,
        O: RelayObserver + ?Sized,
    {
        for &out in &self.options.translation.outbound(byte) {
            match port.write_serial(out) {
                Ok(()) => {
                    self.to_serial += 1;
                    if self.options.trace_bytes {
                        observer.byte_sent(Timestamp::now(), out);
                    }
                }
                Err(e) => warn!("serial write failed: {e}"),
            }
        }
    }
}

/// Turns a fault code from [`Readiness::serial_fault`] into an error.
///
/// `poll(2)` flags an error condition without saying which one, so a code
/// of 0 becomes a generic line error instead of "Success (os error 0)".
fn fault_error(code: i32) -> io::Error {
    if code == 0 {
        io::Error::other("line error reported by the driver")
    } else {
        io::Error::from_raw_os_error(code)
    }
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
