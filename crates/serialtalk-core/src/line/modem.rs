//! Modem control line bitmask.
//!
//! # What are modem control lines? (for beginners)
//!
//! Besides TX and RX, an RS-232 port carries out-of-band signal wires that
//! date back to telephone modems.  Today they are mostly repurposed: many
//! microcontroller boards wire DTR and RTS to their reset and boot pins, so
//! toggling those lines reboots the board.
//!
//! The kernel reports and changes these lines as a bitmask (`TIOCMGET`,
//! `TIOCMBIS`, `TIOCMBIC`).  [`ModemLines`] uses the same bit values so the
//! infrastructure layer can pass it straight through.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// Set of modem control lines, using the Linux `TIOCM_*` bit values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModemLines(pub u32);

impl ModemLines {
    pub const LE: u32 = 0x001;
    pub const DTR: u32 = 0x002;
    pub const RTS: u32 = 0x004;
    pub const ST: u32 = 0x008;
    pub const SR: u32 = 0x010;
    pub const CTS: u32 = 0x020;
    pub const CAR: u32 = 0x040;
    pub const RNG: u32 = 0x080;
    pub const DSR: u32 = 0x100;

    /// Display order and names, matching the status line format.
    const NAMES: [(u32, &'static str); 9] = [
        (Self::LE, "LE"),
        (Self::DTR, "DTR"),
        (Self::RTS, "RTS"),
        (Self::ST, "ST"),
        (Self::SR, "SR"),
        (Self::CTS, "CTS"),
        (Self::CAR, "CAR"),
        (Self::RNG, "RI"),
        (Self::DSR, "DSR"),
    ];

    /// The empty set.
    pub const fn empty() -> Self {
        ModemLines(0)
    }

    /// Returns `true` if no line is present.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `line` is present.
    pub fn contains(&self, line: u32) -> bool {
        line != 0 && self.0 & line == line
    }

    /// Adds `line` to the set.
    pub fn insert(&mut self, line: u32) {
        self.0 |= line;
    }

    /// Returns a copy with `line` added.
    pub fn with(mut self, line: u32) -> Self {
        self.insert(line);
        self
    }

    /// Applies a clear mask and then a set mask to `self`.
    ///
    /// The clear is applied first, so a line present in both masks ends up
    /// set.  This mirrors the order of the `TIOCMBIC` / `TIOCMBIS` calls made
    /// on the real device.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serialtalk_core::ModemLines;
    ///
    /// let current = ModemLines(ModemLines::DTR);
    /// let both = ModemLines(ModemLines::DTR);
    /// assert!(current.apply(both, both).contains(ModemLines::DTR));
    /// ```
    pub fn apply(self, clear: ModemLines, set: ModemLines) -> ModemLines {
        ModemLines((self.0 & !clear.0) | set.0)
    }

    /// Iterates over the names of the lines present, in display order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        Self::NAMES
            .iter()
            .filter(move |(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
    }

    /// Looks up a line by its status-line name (case-insensitive).
    ///
    /// Accepts `RNG` as an alias for `RI`.
    pub fn bit_from_name(name: &str) -> Option<u32> {
        let upper = name.trim().to_ascii_uppercase();
        if upper == "RNG" {
            return Some(Self::RNG);
        }
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == upper)
            .map(|(bit, _)| *bit)
    }
}

impl fmt::Display for ModemLines {
    /// Formats as space-terminated names, e.g. `"DTR RTS "`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.names() {
            write!(f, "{name} ")?;
        }
        Ok(())
    }
}

/// A modem line query paired with the wall-clock time it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStateSnapshot {
    pub at: Timestamp,
    pub lines: ModemLines,
}

impl fmt::Display for LineStateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State: {} {}", self.at, self.lines)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_names_in_status_order() {
        // Arrange
        let lines = ModemLines(ModemLines::DSR | ModemLines::DTR | ModemLines::CTS);

        // Act
        let text = lines.to_string();

        // Assert
        assert_eq!(text, "DTR CTS DSR ");
    }

    #[test]
    fn test_display_of_empty_set_is_empty() {
        assert_eq!(ModemLines::empty().to_string(), "");
    }

    #[test]
    fn test_ring_indicator_is_displayed_as_ri() {
        assert_eq!(ModemLines(ModemLines::RNG).to_string(), "RI ");
    }

    #[test]
    fn test_apply_clears_then_sets() {
        // Arrange
        let current = ModemLines(ModemLines::DTR | ModemLines::RTS);
        let clear = ModemLines(ModemLines::RTS);
        let set = ModemLines(ModemLines::CTS);

        // Act
        let result = current.apply(clear, set);

        // Assert
        assert_eq!(result, ModemLines(ModemLines::DTR | ModemLines::CTS));
    }

    #[test]
    fn test_apply_overlapping_masks_leaves_line_set() {
        // Every combination of starting state and overlapping request must end
        // with the overlapping line set.
        for start in [0, ModemLines::DTR, ModemLines::RTS, ModemLines::DTR | ModemLines::RTS] {
            let clear = ModemLines(ModemLines::DTR | ModemLines::RTS);
            let set = ModemLines(ModemLines::DTR);

            let result = ModemLines(start).apply(clear, set);

            assert!(result.contains(ModemLines::DTR), "start {start:#x}");
            assert!(!result.contains(ModemLines::RTS), "start {start:#x}");
        }
    }

    #[test]
    fn test_bit_from_name_is_case_insensitive() {
        assert_eq!(ModemLines::bit_from_name("dtr"), Some(ModemLines::DTR));
        assert_eq!(ModemLines::bit_from_name(" Rts "), Some(ModemLines::RTS));
        assert_eq!(ModemLines::bit_from_name("RNG"), Some(ModemLines::RNG));
        assert_eq!(ModemLines::bit_from_name("RI"), Some(ModemLines::RNG));
        assert_eq!(ModemLines::bit_from_name("XYZ"), None);
    }

    #[test]
    fn test_contains_rejects_zero_bit() {
        assert!(!ModemLines(0x1ff).contains(0));
    }

    #[test]
    fn test_snapshot_display_matches_status_line() {
        let snapshot = LineStateSnapshot {
            at: Timestamp::new(1_700_000_000, 42),
            lines: ModemLines(ModemLines::DTR | ModemLines::CAR),
        };
        assert_eq!(snapshot.to_string(), "State: 1700000000.000042 DTR CAR ");
    }
}
