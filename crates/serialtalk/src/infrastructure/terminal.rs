//! Optional stdin terminal mode for interactive use.
//!
//! By default a terminal delivers input a line at a time and echoes it.
//! `-n` turns off canonical mode so each key goes to the device at once,
//! `-N` turns off local echo (useful when the device echoes itself).  The
//! original attributes come back when the guard is dropped.

use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use nix::errno::Errno;
use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, Termios};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::StdinMode;

/// Error type for stdin terminal handling.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("can't change stdin terminal mode: {0}")]
    SetAttributes(#[source] io::Error),
}

/// Restores the saved stdin attributes on drop.
#[derive(Debug)]
pub struct StdinModeGuard {
    saved: Termios,
}

impl StdinModeGuard {
    /// Applies `mode` to stdin.
    ///
    /// Returns `Ok(None)` when nothing needs changing or stdin is not a
    /// terminal (for example when input is piped in).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::SetAttributes`] if stdin is a terminal but
    /// refuses the new attributes.
    pub fn apply(mode: StdinMode) -> Result<Option<Self>, TerminalError> {
        if !mode.is_changed() {
            return Ok(None);
        }
        Self::apply_to(io::stdin().as_fd(), mode)
    }

    fn apply_to(fd: BorrowedFd<'_>, mode: StdinMode) -> Result<Option<Self>, TerminalError> {
        let saved = match tcgetattr(fd) {
            Ok(t) => t,
            Err(Errno::ENOTTY) => {
                warn!("stdin is not a terminal; ignoring stdin mode flags");
                return Ok(None);
            }
            Err(e) => return Err(TerminalError::SetAttributes(e.into())),
        };

        let mut attrs = saved.clone();
        if !mode.canonical {
            attrs.local_flags.remove(LocalFlags::ICANON);
        }
        if !mode.echo {
            attrs.local_flags.remove(LocalFlags::ECHO);
        }
        tcsetattr(fd, SetArg::TCSANOW, &attrs).map_err(|e| TerminalError::SetAttributes(e.into()))?;
        debug!(canonical = mode.canonical, echo = mode.echo, "stdin terminal mode changed");
        Ok(Some(Self { saved }))
    }
}

impl Drop for StdinModeGuard {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &self.saved) {
            warn!("can't restore stdin terminal mode: {e}");
        }
    }
}
