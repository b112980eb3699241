//! User-facing trace output.
//!
//! These lines are part of the tool's interface, not diagnostics: they keep a
//! fixed format and are written whenever the matching flag is on, whatever
//! `RUST_LOG` says.  Diagnostics go through `tracing` instead.
//!
//! ```text
//! Received 1700000000.123456 'A' (0x41)
//! Sent 1700000000.123999 <cr> (0x0d)
//! State: 1700000001.000000 DTR RTS CTS
//! Error: 1700000002.000000 Input/output error (os error 5)
//! ```

use std::io::{self, Stderr, Write};
use std::path::Path;

use serialtalk_core::{printable, LinePlan, LineStateSnapshot, Timestamp};

use crate::application::transfer::RelayObserver;

/// Writes trace lines to any [`Write`] sink.
///
/// Write failures are ignored: losing a trace line must never stop the relay.
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    out: W,
}

/// The production trace sink.
pub type StderrTrace = TraceWriter<Stderr>;

impl StderrTrace {
    pub fn stderr() -> Self {
        TraceWriter::new(io::stderr())
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// First line of the verbose dump, before the device is opened.
    pub fn opening(&mut self, device: &Path) {
        let _ = writeln!(self.out, "will now open \"{}\"...", device.display());
    }

    /// The verbose parameter block, after the device is opened.
    pub fn parameters(&mut self, plan: &LinePlan) {
        let _ = writeln!(self.out, "done.");
        let _ = writeln!(self.out, "Parameters:");
        let _ = writeln!(self.out, "\tinput baudrate\t{}", plan.input.effective());
        let _ = writeln!(self.out, "\toutput baudrate\t{}", plan.output.effective());
        let _ = writeln!(self.out, "\twill set {}", plan.set_lines);
        let _ = writeln!(self.out, "\twill clear {}", plan.clear_lines);
        let _ = writeln!(self.out, "\t{} bits", plan.data_bits.count());
        let _ = writeln!(self.out, "\t{} parity", plan.parity.label());
    }
}

impl<W: Write> RelayObserver for TraceWriter<W> {
    fn byte_received(&mut self, at: Timestamp, byte: u8) {
        let _ = writeln!(self.out, "Received {at} '{}' (0x{byte:02x})", printable(byte));
    }

    fn byte_sent(&mut self, at: Timestamp, byte: u8) {
        let _ = if byte == b'\r' {
            writeln!(self.out, "Sent {at} <cr> (0x{byte:02x})")
        } else {
            writeln!(self.out, "Sent {at} '{}' (0x{byte:02x})", printable(byte))
        };
    }

    fn line_state(&mut self, snapshot: LineStateSnapshot) {
        let _ = writeln!(self.out, "{snapshot}");
    }

    fn serial_fault(&mut self, at: Timestamp, error: &io::Error) {
        let _ = writeln!(self.out, "Error: {at} {error}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
