//! Production [`RelayPort`] built on `poll(2)`.

use std::io;
use std::os::fd::AsFd;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::trace;

use serialtalk_core::{ModemLines, Timeout};

use crate::application::configure_line::LineControl;
use crate::application::transfer::{Readiness, RelayPort};
use crate::infrastructure::peer::Peer;
use crate::infrastructure::serial::SerialDevice;

/// Waits on a [`SerialDevice`] and a [`Peer`] with one `poll(2)` call.
pub struct PollPort<'a> {
    serial: &'a mut SerialDevice,
    peer: &'a mut Peer,
}

impl<'a> PollPort<'a> {
    pub fn new(serial: &'a mut SerialDevice, peer: &'a mut Peer) -> Self {
        Self { serial, peer }
    }
}

fn poll_timeout(timeout: Timeout) -> PollTimeout {
    match timeout {
        Timeout::Forever => PollTimeout::NONE,
        Timeout::Immediate => PollTimeout::ZERO,
        Timeout::Millis(_) => PollTimeout::try_from(timeout.as_millis()).unwrap_or(PollTimeout::NONE),
    }
}

impl RelayPort for PollPort<'_> {
    fn wait(&mut self, peer_armed: bool, timeout: Timeout) -> io::Result<Readiness> {
        let watch = PollFlags::POLLIN | PollFlags::POLLERR;
        let mut fds = vec![PollFd::new(self.serial.as_fd(), watch)];
        if peer_armed {
            fds.push(PollFd::new(self.peer.input_fd(), PollFlags::POLLIN));
        }

        // POLLERR carries no code of its own.  errno is cleared first so a
        // stale value from an earlier call is never reported as the cause.
        Errno::clear();
        let ready = poll(&mut fds, poll_timeout(timeout))?;
        let last_error = Errno::last_raw();
        trace!(ready, peer_armed, "poll returned");

        let serial = fds[0].revents().unwrap_or(PollFlags::empty());
        let peer = fds
            .get(1)
            .and_then(PollFd::revents)
            .unwrap_or(PollFlags::empty());

        Ok(Readiness {
            serial_readable: serial.contains(PollFlags::POLLIN),
            serial_fault: serial.contains(PollFlags::POLLERR).then_some(last_error),
            serial_hangup: serial.intersects(PollFlags::POLLHUP | PollFlags::POLLNVAL),
            peer_readable: peer.contains(PollFlags::POLLIN),
            peer_hangup: peer.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL),
        })
    }

    fn read_serial(&mut self) -> io::Result<Option<u8>> {
        self.serial.read_byte()
    }

    fn write_serial(&mut self, byte: u8) -> io::Result<()> {
        self.serial.write_byte(byte)
    }

    fn read_peer(&mut self) -> io::Result<Option<u8>> {
        self.peer.read_byte()
    }

    fn write_peer(&mut self, byte: u8) -> io::Result<()> {
        self.peer.write_byte(byte)
    }

    fn line_state(&mut self) -> io::Result<ModemLines> {
        self.serial.modem_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_mapping() {
        assert_eq!(poll_timeout(Timeout::Forever), PollTimeout::NONE);
        assert_eq!(poll_timeout(Timeout::Immediate), PollTimeout::ZERO);
        assert_eq!(
            poll_timeout(Timeout::Millis(250)),
            PollTimeout::try_from(250i32).expect("in range")
        );
    }
}
