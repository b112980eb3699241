//! Wall-clock timestamps for traces and status lines.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds and microseconds since the Unix epoch.
///
/// Displays as `seconds.microseconds` with six fractional digits, the format
/// every trace line uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub secs: u64,
    pub micros: u32,
}

impl Timestamp {
    /// Creates a timestamp from its parts.  `micros` is clamped below one second.
    pub fn new(secs: u64, micros: u32) -> Self {
        Self {
            secs,
            micros: micros.min(999_999),
        }
    }

    /// Reads the current wall-clock time.
    ///
    /// A clock set before 1970 reads as the epoch rather than failing.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: since_epoch.as_secs(),
            micros: since_epoch.subsec_micros(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// Renders `byte` for a trace line: control characters and non-ASCII bytes
/// become a space, everything else is shown as-is.
pub fn printable(byte: u8) -> char {
    if byte < b' ' || byte >= 0x7f {
        ' '
    } else {
        byte as char
    }
}
