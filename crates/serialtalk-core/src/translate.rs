//! Per-byte newline translation.
//!
//! # Why translate newlines? (for beginners)
//!
//! Unix terminals end a line with LF (`\n`).  Many serial devices, modems and
//! bootloaders expect CR (`\r`) or CR LF (`\r\n`) instead, and they usually
//! *send* CR.  The relay can bridge the two conventions:
//!
//! | Direction        | Mode    | Input  | Output   |
//! |------------------|---------|--------|----------|
//! | peer → serial    | expand  | `\n`   | `\r\n`   |
//! | peer → serial    | replace | `\n`   | `\r`     |
//! | serial → peer    | expand  | `\r`   | `\r\n`   |
//! | serial → peer    | replace | `\r`   | `\n`     |
//!
//! Translation works on exactly one byte at a time, so a decision never
//! depends on what the next read will return.

use serde::{Deserialize, Serialize};

/// Rewriting applied to LF bytes travelling from the peer to the serial line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundNewline {
    #[default]
    None,
    /// `\n` becomes `\r\n`.
    CrLf,
    /// `\n` becomes `\r`.
    Cr,
}

/// Rewriting applied to CR bytes travelling from the serial line to the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundCarriageReturn {
    #[default]
    None,
    /// `\r` becomes `\r\n`.
    CrLf,
    /// `\r` becomes `\n`.
    Lf,
}

/// Translation modes for both directions of one relay session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationPolicy {
    #[serde(default)]
    pub outbound: OutboundNewline,
    #[serde(default)]
    pub inbound: InboundCarriageReturn,
}

impl TranslationPolicy {
    /// Translates one byte read from the peer into the bytes to write to the
    /// serial line.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serialtalk_core::{OutboundNewline, TranslationPolicy};
    ///
    /// let policy = TranslationPolicy { outbound: OutboundNewline::CrLf, ..Default::default() };
    /// assert_eq!(policy.outbound(b'\n').as_slice(), b"\r\n");
    /// assert_eq!(policy.outbound(b'A').as_slice(), b"A");
    /// ```
    pub fn outbound(&self, byte: u8) -> Translated {
        match (self.outbound, byte) {
            (OutboundNewline::CrLf, b'\n') => Translated::pair(b'\r', b'\n'),
            (OutboundNewline::Cr, b'\n') => Translated::single(b'\r'),
            _ => Translated::single(byte),
        }
    }

    /// Translates one byte read from the serial line into the bytes to write
    /// to the peer.
    pub fn inbound(&self, byte: u8) -> Translated {
        match (self.inbound, byte) {
            (InboundCarriageReturn::CrLf, b'\r') => Translated::pair(b'\r', b'\n'),
            (InboundCarriageReturn::Lf, b'\r') => Translated::single(b'\n'),
            _ => Translated::single(byte),
        }
    }
}

/// The one or two bytes produced by translating a single input byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translated {
    bytes: [u8; 2],
    len: usize,
}

impl Translated {
    fn single(byte: u8) -> Self {
        Self {
            bytes: [byte, 0],
            len: 1,
        }
    }

    fn pair(first: u8, second: u8) -> Self {
        Self {
            bytes: [first, second],
            len: 2,
        }
    }

    /// The translated bytes, in write order.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl<'a> IntoIterator for &'a Translated {
    type Item = &'a u8;
    type IntoIter = std::slice::Iter<'a, u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
