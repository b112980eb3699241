//! Baud rate table and resolution.
//!
//! The OS exposes a fixed set of rates through the `termios` speed constants
//! (`B9600`, `B115200`, ...).  Any other rate is a *custom* rate: the line is
//! programmed at [`CUSTOM_PLACEHOLDER_BAUD`] and the UART clock divisor is
//! then set directly so the effective rate becomes `baud_base / divisor`.

use serde::{Deserialize, Serialize};

/// Every rate with a dedicated `termios` speed constant, in ascending order.
pub const STANDARD_BAUD_RATES: [u32; 30] = [
    0, 50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000, 3000000,
    3500000, 4000000,
];

/// Standard rate programmed before the custom divisor is applied.
///
/// Linux serial drivers only honour `ASYNC_SPD_CUST` while the line is set to
/// 38400 baud.
pub const CUSTOM_PLACEHOLDER_BAUD: u32 = 38400;

/// How a requested rate maps onto the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaudSelection {
    /// The rate has a `termios` speed constant.
    Standard(u32),
    /// The rate needs a clock divisor; `placeholder` is what `termios` gets.
    Custom { requested: u32, placeholder: u32 },
}

impl BaudSelection {
    /// The rate the line will actually run at once configuration completes.
    pub fn effective(&self) -> u32 {
        match *self {
            BaudSelection::Standard(rate) => rate,
            BaudSelection::Custom { requested, .. } => requested,
        }
    }

    /// The rate handed to `cfsetispeed` / `cfsetospeed`.
    pub fn termios_rate(&self) -> u32 {
        match *self {
            BaudSelection::Standard(rate) => rate,
            BaudSelection::Custom { placeholder, .. } => placeholder,
        }
    }

    /// Returns `true` for [`BaudSelection::Custom`].
    pub fn is_custom(&self) -> bool {
        matches!(self, BaudSelection::Custom { .. })
    }
}

/// Returns `true` if `rate` appears in [`STANDARD_BAUD_RATES`].
pub fn is_standard(rate: u32) -> bool {
    STANDARD_BAUD_RATES.binary_search(&rate).is_ok()
}

/// Classifies `rate` as standard or custom.
///
/// This never fails; whether a custom rate is *allowed* depends on the other
/// direction and on the platform, which [`crate::LineConfig::plan`] checks.
///
/// # Examples
///
/// ```rust
/// use serialtalk_core::{resolve_baud, BaudSelection};
///
/// assert_eq!(resolve_baud(115200), BaudSelection::Standard(115200));
/// assert!(resolve_baud(250000).is_custom());
/// ```
pub fn resolve_baud(rate: u32) -> BaudSelection {
    if is_standard(rate) {
        BaudSelection::Standard(rate)
    } else {
        BaudSelection::Custom {
            requested: rate,
            placeholder: CUSTOM_PLACEHOLDER_BAUD,
        }
    }
}

/// Computes the UART clock divisor for a custom rate.
///
/// Returns `None` when the rate is zero or faster than the base clock, since
/// both would program a divisor of zero.
pub fn custom_divisor(baud_base: u32, requested: u32) -> Option<u32> {
    if requested == 0 {
        return None;
    }
    match baud_base / requested {
        0 => None,
        divisor => Some(divisor),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_sorted_for_binary_search() {
        let mut sorted = STANDARD_BAUD_RATES;
        sorted.sort_unstable();
        assert_eq!(sorted, STANDARD_BAUD_RATES);
    }

    #[test]
    fn test_every_table_entry_resolves_to_standard() {
        for rate in STANDARD_BAUD_RATES {
            assert_eq!(resolve_baud(rate), BaudSelection::Standard(rate), "rate {rate}");
        }
    }

    #[test]
    fn test_unlisted_rate_resolves_to_custom_with_placeholder() {
        // Arrange / Act
        let selection = resolve_baud(250_000);

        // Assert
        assert_eq!(
            selection,
            BaudSelection::Custom {
                requested: 250_000,
                placeholder: 38400
            }
        );
        assert_eq!(selection.termios_rate(), 38400);
        assert_eq!(selection.effective(), 250_000);
    }

    #[test]
    fn test_zero_is_a_standard_rate() {
        // B0 means "hang up" on most drivers but is still a valid constant.
        assert!(is_standard(0));
    }

    #[test]
    fn test_custom_divisor_uses_integer_division() {
        assert_eq!(custom_divisor(24_000_000, 250_000), Some(96));
        assert_eq!(custom_divisor(115_200, 31_250), Some(3));
    }

    #[test]
    fn test_custom_divisor_rejects_zero_results() {
        assert_eq!(custom_divisor(115_200, 0), None);
        assert_eq!(custom_divisor(115_200, 200_000), None);
    }
}
