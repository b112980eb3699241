//! Scripted relay port and recording observer for unit testing.
//!
//! Allows tests to drive the transfer loop with a fixed sequence of
//! readiness results, without a serial device or a socket.

use std::collections::VecDeque;
use std::io;

use serialtalk_core::{LineStateSnapshot, ModemLines, Timeout, Timestamp};

use crate::application::transfer::{Readiness, RelayObserver, RelayPort};

/// Waits allowed after the script runs out before the mock assumes the loop
/// under test never terminates.
const EXHAUSTED_WAIT_LIMIT: usize = 10_000;

/// A mock implementation of [`RelayPort`] that replays a script.
///
/// Each scripted entry is the result of one [`RelayPort::wait`] call.  Once the
/// script is empty every wait times out idle.
#[derive(Debug, Default)]
pub struct MockRelayPort {
    script: VecDeque<Result<Readiness, io::ErrorKind>>,
    serial_input: VecDeque<Option<u8>>,
    peer_input: VecDeque<u8>,
    serial_output: Vec<u8>,
    peer_output: Vec<u8>,
    waits: Vec<(bool, Timeout)>,
    lines: ModemLines,
    peer_writes_fail: bool,
    exhausted_waits: usize,
}

impl MockRelayPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one raw readiness result.
    pub fn push(&mut self, readiness: Readiness) {
        self.script.push_back(Ok(readiness));
    }

    /// Queues `data` as serial input, one readable event per byte.
    pub fn push_serial_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.serial_input.push_back(Some(b));
            self.push(Readiness {
                serial_readable: true,
                ..Default::default()
            });
        }
    }

    /// Queues `data` as peer input, one readable event per byte.
    pub fn push_peer_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.peer_input.push_back(b);
            self.push(Readiness {
                peer_readable: true,
                ..Default::default()
            });
        }
    }

    /// Queues a readable event whose serial read returns end-of-file.
    pub fn push_serial_eof(&mut self) {
        self.serial_input.push_back(None);
        self.push(Readiness {
            serial_readable: true,
            ..Default::default()
        });
    }

    /// Queues a hang-up on the serial line with no pending data.
    pub fn push_serial_hangup(&mut self) {
        self.push(Readiness {
            serial_hangup: true,
            ..Default::default()
        });
    }

    /// Queues a peer hang-up with no pending data.
    pub fn push_peer_hangup(&mut self) {
        self.push(Readiness {
            peer_hangup: true,
            ..Default::default()
        });
    }

    /// Queues an error condition on the serial line.
    pub fn push_serial_fault(&mut self, code: i32) {
        self.push(Readiness {
            serial_fault: Some(code),
            ..Default::default()
        });
    }

    /// Queues `count` waits that time out without events.
    pub fn push_idle(&mut self, count: usize) {
        for _ in 0..count {
            self.push(Readiness::default());
        }
    }

    /// Queues a wait interrupted by a signal.
    pub fn push_interrupted(&mut self) {
        self.push_wait_error(io::ErrorKind::Interrupted);
    }

    /// Queues a failing wait.
    pub fn push_wait_error(&mut self, kind: io::ErrorKind) {
        self.script.push_back(Err(kind));
    }

    /// Makes every later peer write fail with a broken pipe.
    pub fn fail_peer_writes(&mut self) {
        self.peer_writes_fail = true;
    }

    /// Sets the modem line state reported by [`RelayPort::line_state`].
    pub fn set_lines(&mut self, lines: ModemLines) {
        self.lines = lines;
    }

    /// Bytes written to the serial line so far.
    pub fn serial_output(&self) -> &[u8] {
        &self.serial_output
    }

    /// Bytes written to the peer so far.
    pub fn peer_output(&self) -> &[u8] {
        &self.peer_output
    }

    /// `(peer_armed, timeout)` for every wait, in call order.
    pub fn waits(&self) -> &[(bool, Timeout)] {
        &self.waits
    }

    pub fn wait_count(&self) -> usize {
        self.waits.len()
    }
}

impl RelayPort for MockRelayPort {
    fn wait(&mut self, peer_armed: bool, timeout: Timeout) -> io::Result<Readiness> {
        self.waits.push((peer_armed, timeout));
        match self.script.pop_front() {
            Some(Ok(readiness)) => Ok(readiness),
            Some(Err(kind)) => Err(io::Error::from(kind)),
            None => {
                self.exhausted_waits += 1;
                assert!(
                    self.exhausted_waits < EXHAUSTED_WAIT_LIMIT,
                    "MockRelayPort script exhausted and the loop is still waiting"
                );
                Ok(Readiness::default())
            }
        }
    }

    fn read_serial(&mut self) -> io::Result<Option<u8>> {
        Ok(self.serial_input.pop_front().flatten())
    }

    fn write_serial(&mut self, byte: u8) -> io::Result<()> {
        self.serial_output.push(byte);
        Ok(())
    }

    fn read_peer(&mut self) -> io::Result<Option<u8>> {
        Ok(self.peer_input.pop_front())
    }

    fn write_peer(&mut self, byte: u8) -> io::Result<()> {
        if self.peer_writes_fail {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.peer_output.push(byte);
        Ok(())
    }

    fn line_state(&mut self) -> io::Result<ModemLines> {
        Ok(self.lines)
    }
}

/// A [`RelayObserver`] that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub received: Vec<u8>,
    pub sent: Vec<u8>,
    pub snapshots: Vec<LineStateSnapshot>,
    /// Raw OS error codes of reported serial faults.
    pub faults: Vec<i32>,
}

impl RelayObserver for RecordingObserver {
    fn byte_received(&mut self, _at: Timestamp, byte: u8) {
        self.received.push(byte);
    }

    fn byte_sent(&mut self, _at: Timestamp, byte: u8) {
        self.sent.push(byte);
    }

    fn line_state(&mut self, snapshot: LineStateSnapshot) {
        self.snapshots.push(snapshot);
    }

    fn serial_fault(&mut self, _at: Timestamp, error: &io::Error) {
        self.faults.push(error.raw_os_error().unwrap_or(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_script_then_idles() {
        // Arrange
        let mut port = MockRelayPort::new();
        port.push_serial_bytes(b"a");

        // Act
        let first = port.wait(true, Timeout::Forever).expect("wait");
        let byte = port.read_serial().expect("read");
        let second = port.wait(true, Timeout::Forever).expect("wait");

        // Assert
        assert!(first.serial_readable);
        assert_eq!(byte, Some(b'a'));
        assert!(second.is_idle());
        assert_eq!(port.wait_count(), 2);
    }

    #[test]
    fn test_mock_peer_read_past_end_is_eof() {
        let mut port = MockRelayPort::new();
        assert_eq!(port.read_peer().expect("read"), None);
    }

    #[test]
    fn test_mock_records_writes() {
        let mut port = MockRelayPort::new();
        port.write_serial(b'1').expect("write");
        port.write_peer(b'2').expect("write");
        assert_eq!(port.serial_output(), b"1");
        assert_eq!(port.peer_output(), b"2");
    }

    #[test]
    fn test_mock_failing_peer_writes() {
        let mut port = MockRelayPort::new();
        port.fail_peer_writes();
        let err = port.write_peer(b'x').expect_err("should fail");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
