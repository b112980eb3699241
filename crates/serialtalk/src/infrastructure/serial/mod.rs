//! Serial device infrastructure.
//!
//! [`SerialDevice`] owns the open tty and implements [`LineControl`] with
//! `termios`, `fcntl` and the modem-control ioctls.  It is also the serial
//! half of the production [`crate::infrastructure::relay_port::PollPort`].
//!
//! # Testability
//!
//! Everything the configurator does goes through [`LineControl`], so its
//! ordering rules are tested against [`mock::MockLineControl`].  The termios
//! mapping itself can be exercised on a pseudo-terminal with
//! [`SerialDevice::from_file`].

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc::{self, c_int};
use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
use thiserror::Error;
use tracing::debug;

use serialtalk_core::{LinePlan, ModemLines};

use crate::application::configure_line::LineControl;

#[cfg(target_os = "linux")]
mod custom_baud;
pub mod mock;
pub mod termios;

nix::ioctl_read_bad!(tiocmget, libc::TIOCMGET, c_int);
nix::ioctl_write_ptr_bad!(tiocmbis, libc::TIOCMBIS, c_int);
nix::ioctl_write_ptr_bad!(tiocmbic, libc::TIOCMBIC, c_int);

/// Errors opening the serial device.
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("can't open device {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An open serial line.
#[derive(Debug)]
pub struct SerialDevice {
    file: File,
    path: PathBuf,
}

impl SerialDevice {
    /// Opens `path` for reading and writing.
    ///
    /// The device does not become the controlling terminal, and the open does
    /// not wait for carrier detect.  Reads stay non-blocking until
    /// [`LineControl::set_blocking`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Open`] if the device cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SerialError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| SerialError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "serial device opened");
        Ok(Self::from_file(file, path))
    }

    /// Wraps an already open tty, e.g. the slave side of a pseudo-terminal.
    pub fn from_file(file: File, path: impl Into<PathBuf>) -> Self {
        Self {
            file,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads one byte.
    ///
    /// A hung-up tty reads as end-of-file or fails with `EIO`; both are
    /// reported as `Ok(None)`.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match (&self.file).read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.raw_os_error() == Some(libc::EIO) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn write_byte(&self, byte: u8) -> io::Result<()> {
        (&self.file).write_all(&[byte])
    }

    /// The current `termios` attributes of the line.
    pub fn attributes(&self) -> io::Result<Termios> {
        Ok(tcgetattr(&self.file)?)
    }

    /// The `(input, output)` rates currently programmed, as numbers.
    pub fn speeds(&self) -> io::Result<(Option<u32>, Option<u32>)> {
        Ok(termios::speeds(&self.attributes()?))
    }
}

impl AsFd for SerialDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Write for &SerialDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&self.file).flush()
    }
}

fn modem_bits(lines: ModemLines) -> io::Result<c_int> {
    c_int::try_from(lines.0)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "modem line mask out of range"))
}

impl LineControl for SerialDevice {
    fn commit(&mut self, plan: &LinePlan) -> io::Result<()> {
        let mut attrs = tcgetattr(&self.file)?;
        termios::apply_plan(&mut attrs, plan)?;
        tcsetattr(&self.file, SetArg::TCSANOW, &attrs)?;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn baud_base(&mut self) -> io::Result<u32> {
        custom_baud::baud_base(&self.file)
    }

    #[cfg(not(target_os = "linux"))]
    fn baud_base(&mut self) -> io::Result<u32> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "custom baud rates need Linux",
        ))
    }

    #[cfg(target_os = "linux")]
    fn set_custom_divisor(&mut self, divisor: u32) -> io::Result<()> {
        custom_baud::set_custom_divisor(&self.file, divisor)
    }

    #[cfg(not(target_os = "linux"))]
    fn set_custom_divisor(&mut self, _divisor: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "custom baud rates need Linux",
        ))
    }

    fn set_blocking(&mut self) -> io::Result<()> {
        let flags = OFlag::from_bits_truncate(fcntl(&self.file, FcntlArg::F_GETFL)?);
        fcntl(&self.file, FcntlArg::F_SETFL(flags & !OFlag::O_NONBLOCK))?;
        Ok(())
    }

    fn modem_lines(&mut self) -> io::Result<ModemLines> {
        let mut bits: c_int = 0;
        // SAFETY: `bits` is a valid, writable int for the duration of the call.
        unsafe { tiocmget(self.file.as_raw_fd(), &mut bits) }?;
        Ok(ModemLines(u32::try_from(bits).unwrap_or_default()))
    }

    fn clear_modem_lines(&mut self, lines: ModemLines) -> io::Result<()> {
        let bits = modem_bits(lines)?;
        // SAFETY: `bits` outlives the call.
        unsafe { tiocmbic(self.file.as_raw_fd(), &bits) }?;
        Ok(())
    }

    fn set_modem_lines(&mut self, lines: ModemLines) -> io::Result<()> {
        let bits = modem_bits(lines)?;
        // SAFETY: `bits` outlives the call.
        unsafe { tiocmbis(self.file.as_raw_fd(), &bits) }?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
