//! Mapping between [`LinePlan`] and `termios` attributes.
//!
//! Kept separate from the device so the mapping can be checked on any tty,
//! including a pseudo-terminal in tests.

use std::io;

use nix::sys::termios::{
    cfgetispeed, cfgetospeed, cfsetispeed, cfsetospeed, BaudRate, ControlFlags, InputFlags,
    LocalFlags, OutputFlags, SpecialCharacterIndices, Termios,
};

use serialtalk_core::{DataBits, LinePlan, Parity, STANDARD_BAUD_RATES};

/// The `termios` speed constant for `rate`, if the platform has one.
pub fn baud_constant(rate: u32) -> Option<BaudRate> {
    let baud = match rate {
        0 => BaudRate::B0,
        50 => BaudRate::B50,
        75 => BaudRate::B75,
        110 => BaudRate::B110,
        134 => BaudRate::B134,
        150 => BaudRate::B150,
        200 => BaudRate::B200,
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        1800 => BaudRate::B1800,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        #[cfg(target_os = "linux")]
        500000 => BaudRate::B500000,
        #[cfg(target_os = "linux")]
        576000 => BaudRate::B576000,
        #[cfg(target_os = "linux")]
        921600 => BaudRate::B921600,
        #[cfg(target_os = "linux")]
        1000000 => BaudRate::B1000000,
        #[cfg(target_os = "linux")]
        1152000 => BaudRate::B1152000,
        #[cfg(target_os = "linux")]
        1500000 => BaudRate::B1500000,
        #[cfg(target_os = "linux")]
        2000000 => BaudRate::B2000000,
        #[cfg(target_os = "linux")]
        2500000 => BaudRate::B2500000,
        #[cfg(target_os = "linux")]
        3000000 => BaudRate::B3000000,
        #[cfg(target_os = "linux")]
        3500000 => BaudRate::B3500000,
        #[cfg(target_os = "linux")]
        4000000 => BaudRate::B4000000,
        _ => return None,
    };
    Some(baud)
}

/// The numeric rate of a `termios` speed constant.
pub fn rate_of(baud: BaudRate) -> Option<u32> {
    STANDARD_BAUD_RATES
        .iter()
        .copied()
        .find(|&rate| baud_constant(rate) == Some(baud))
}

fn char_size(bits: DataBits) -> ControlFlags {
    match bits {
        DataBits::Five => ControlFlags::CS5,
        DataBits::Six => ControlFlags::CS6,
        DataBits::Seven => ControlFlags::CS7,
        DataBits::Eight => ControlFlags::CS8,
    }
}

/// Rewrites `termios` for a raw, byte-at-a-time line matching `plan`.
///
/// Input: breaks ignored, parity errors ignored only when parity is off, no
/// CR/LF mapping.  Output: no post-processing.  Control: receiver on, modem
/// status ignored, character size, parity, optional hang-up on close.
/// Local: no canonical mode, echo or signals.  Reads return after one byte.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] if a planned rate has no speed
/// constant on this platform.
pub fn apply_plan(termios: &mut Termios, plan: &LinePlan) -> io::Result<()> {
    termios.input_flags = InputFlags::IGNBRK;
    if plan.parity == Parity::None {
        termios.input_flags |= InputFlags::IGNPAR;
    }

    termios.output_flags = OutputFlags::empty();

    let mut control = char_size(plan.data_bits) | ControlFlags::CREAD | ControlFlags::CLOCAL;
    match plan.parity {
        Parity::None => {}
        Parity::Odd => control |= ControlFlags::PARENB | ControlFlags::PARODD,
        Parity::Even => control |= ControlFlags::PARENB,
    }
    if plan.hangup_on_close {
        control |= ControlFlags::HUPCL;
    }
    termios.control_flags = control;

    termios.local_flags = LocalFlags::empty();
    termios.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    termios.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

    cfsetispeed(termios, speed(plan.input.termios_rate())?)?;
    cfsetospeed(termios, speed(plan.output.termios_rate())?)?;
    Ok(())
}

/// Reads the `(input, output)` rates stored in `termios`.
pub fn speeds(termios: &Termios) -> (Option<u32>, Option<u32>) {
    (rate_of(cfgetispeed(termios)), rate_of(cfgetospeed(termios)))
}

fn speed(rate: u32) -> io::Result<BaudRate> {
    baud_constant(rate).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no termios speed constant for {rate} baud"),
        )
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_rates_have_constants() {
        for rate in [300, 1200, 9600, 19200, 38400, 57600, 115200] {
            assert!(baud_constant(rate).is_some(), "{rate}");
        }
    }

    #[test]
    fn test_unknown_rate_has_no_constant() {
        assert_eq!(baud_constant(250_000), None);
        assert_eq!(baud_constant(9601), None);
    }

    #[test]
    fn test_rate_of_inverts_baud_constant() {
        for rate in [0, 110, 4800, 115200, 230400] {
            let baud = baud_constant(rate).expect("constant");
            assert_eq!(rate_of(baud), Some(rate));
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_every_standard_rate_maps_on_linux() {
        for rate in STANDARD_BAUD_RATES {
            assert!(baud_constant(rate).is_some(), "{rate}");
        }
    }
}
