//! Declarative line configuration and its validation.
//!
//! [`LineConfig`] is what the user asked for.  [`LineConfig::plan`] checks it
//! against the platform [`Capabilities`] and returns a [`LinePlan`]: the same
//! settings with every baud rate resolved to either a standard `termios`
//! constant or a custom divisor request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::line::baud::{resolve_baud, BaudSelection};
use crate::line::modem::ModemLines;

/// Errors produced while validating a [`LineConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    /// A custom rate was requested on a platform without divisor support.
    #[error("illegal baud rate {0}: custom rates are not supported on this platform")]
    CustomBaudUnsupported(u32),

    /// A custom rate was requested with different input and output rates.
    ///
    /// The divisor register is shared by both directions, so a custom rate
    /// must be used for both.
    #[error("illegal baud rate: custom rate needs equal input and output baud (input {input}, output {output})")]
    CustomBaudMismatch { input: u32, output: u32 },

    /// The custom rate cannot be reached with the UART base clock.
    #[error("illegal baud rate {requested}: base clock {baud_base} gives a zero divisor")]
    UnreachableBaud { requested: u32, baud_base: u32 },

    /// The character size is not 5, 6, 7, or 8.
    #[error("invalid number of data bits: {0} (must be 5, 6, 7, or 8)")]
    InvalidDataBits(u8),
}

/// Character size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl DataBits {
    /// Number of data bits per character.
    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = LineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(LineError::InvalidDataBits(other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> u8 {
        bits.count()
    }
}

/// Parity generation and checking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit; parity errors on input are ignored.
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Word used in the verbose parameter dump (`"no"`, `"odd"`, `"even"`).
    pub fn label(self) -> &'static str {
        match self {
            Parity::None => "no",
            Parity::Odd => "odd",
            Parity::Even => "even",
        }
    }
}

/// What the running platform can do with a serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether a non-standard rate can be set through a clock divisor.
    pub supports_custom_baud: bool,
}

impl Capabilities {
    /// Capabilities of the build target.
    ///
    /// Custom divisors go through the Linux `TIOCSSERIAL` ioctl, so only Linux
    /// reports support.
    pub fn for_current_platform() -> Self {
        Self {
            supports_custom_baud: cfg!(target_os = "linux"),
        }
    }
}

/// User-facing line settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Receive rate.
    pub input_baud: u32,
    /// Transmit rate; `0` means "same as `input_baud`".
    pub output_baud: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    /// Lower the modem control lines when the device is closed (`HUPCL`).
    pub hangup_on_close: bool,
    /// Lines raised after configuration.
    pub set_lines: ModemLines,
    /// Lines lowered after configuration, before `set_lines` is applied.
    pub clear_lines: ModemLines,
}

impl Default for LineConfig {
    /// 9600 baud both ways, 8 data bits, no parity, no line changes.
    fn default() -> Self {
        Self {
            input_baud: 9600,
            output_baud: 0,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            hangup_on_close: false,
            set_lines: ModemLines::empty(),
            clear_lines: ModemLines::empty(),
        }
    }
}

impl LineConfig {
    /// The transmit rate after applying the "0 means same as input" rule.
    pub fn effective_output_baud(&self) -> u32 {
        if self.output_baud == 0 {
            self.input_baud
        } else {
            self.output_baud
        }
    }

    /// Validates the configuration and resolves both baud rates.
    ///
    /// # Errors
    ///
    /// - [`LineError::CustomBaudUnsupported`] if either rate is non-standard
    ///   and `caps.supports_custom_baud` is `false`.
    /// - [`LineError::CustomBaudMismatch`] if either rate is non-standard and
    ///   the input and output rates differ.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serialtalk_core::{Capabilities, LineConfig};
    ///
    /// let cfg = LineConfig { input_baud: 250_000, ..LineConfig::default() };
    /// let plan = cfg.plan(Capabilities { supports_custom_baud: true }).unwrap();
    /// assert_eq!(plan.custom_rate(), Some(250_000));
    /// ```
    pub fn plan(&self, caps: Capabilities) -> Result<LinePlan, LineError> {
        let input_rate = self.input_baud;
        let output_rate = self.effective_output_baud();
        let input = resolve_baud(input_rate);
        let output = resolve_baud(output_rate);

        if input.is_custom() || output.is_custom() {
            let custom = if input.is_custom() { input_rate } else { output_rate };
            if !caps.supports_custom_baud {
                return Err(LineError::CustomBaudUnsupported(custom));
            }
            if input_rate != output_rate {
                return Err(LineError::CustomBaudMismatch {
                    input: input_rate,
                    output: output_rate,
                });
            }
        }

        Ok(LinePlan {
            input,
            output,
            data_bits: self.data_bits,
            parity: self.parity,
            hangup_on_close: self.hangup_on_close,
            set_lines: self.set_lines,
            clear_lines: self.clear_lines,
        })
    }
}

/// A validated [`LineConfig`] ready to be applied to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePlan {
    pub input: BaudSelection,
    pub output: BaudSelection,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub hangup_on_close: bool,
    pub set_lines: ModemLines,
    pub clear_lines: ModemLines,
}

impl LinePlan {
    /// The rate that needs the divisor step after the attributes are committed.
    ///
    /// [`LineConfig::plan`] guarantees both directions agree when this is `Some`.
    pub fn custom_rate(&self) -> Option<u32> {
        match (self.input, self.output) {
            (BaudSelection::Custom { requested, .. }, _)
            | (_, BaudSelection::Custom { requested, .. }) => Some(requested),
            _ => None,
        }
    }

    /// Returns `true` if any modem line is to be set or cleared.
    pub fn changes_lines(&self) -> bool {
        !self.set_lines.is_empty() || !self.clear_lines.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
