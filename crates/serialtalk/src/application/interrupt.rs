//! One-shot ctrl-c mode: send a single interrupt byte and stop.
//!
//! Useful for breaking a device out of a running program from a script,
//! without opening an interactive session.

use std::io::{self, Write};

use tracing::info;

/// ASCII ETX, what a terminal sends for ctrl-c.
pub const INTERRUPT_BYTE: u8 = 0x03;

/// Writes exactly one [`INTERRUPT_BYTE`] to `serial`.
///
/// # Errors
///
/// Returns the underlying I/O error if the byte cannot be written.
pub fn send_interrupt<W: Write + ?Sized>(serial: &mut W) -> io::Result<()> {
    serial.write_all(&[INTERRUPT_BYTE])?;
    serial.flush()?;
    info!("interrupt byte sent");
    Ok(())
}
