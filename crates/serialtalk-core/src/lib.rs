//! # serialtalk-core
//!
//! Pure logic shared by the `serialtalk` relay: how a declarative line
//! configuration resolves into concrete serial settings, how bytes are
//! rewritten on their way through the relay, and the state machine that
//! decides when a relay session ends.
//!
//! This crate has zero dependencies on OS APIs or file descriptors.  The
//! `serialtalk` crate applies the results to a real tty.
//!
//! # Architecture overview (for beginners)
//!
//! `serialtalk` sits between a serial device (a UART behind `/dev/ttyS0`,
//! `/dev/ttyUSB0`, ...) and one *peer*: either your terminal or a single TCP
//! connection.  Every byte typed on the peer side is written to the serial
//! line, and every byte the device sends is written back to the peer.
//!
//! - **`line`** – Baud rates, framing, parity, and the modem control lines
//!   (DTR, RTS, ...).  [`LineConfig::plan`] validates a configuration against
//!   the platform [`Capabilities`] and produces a [`LinePlan`].
//!
//! - **`translate`** – Optional newline rewriting.  Terminals send `\n`, many
//!   devices expect `\r\n` or `\r`; the [`TranslationPolicy`] handles both
//!   directions one byte at a time.
//!
//! - **`session`** – The [`SessionState`] machine: timeouts, peer hang-up, and
//!   the idle window that keeps draining the serial side after the peer has
//!   gone away.
//!
//! - **`clock`** – Wall-clock [`Timestamp`]s in the `seconds.microseconds`
//!   form used by the byte traces.

pub mod clock;
pub mod line;
pub mod session;
pub mod translate;

pub use clock::{printable, Timestamp};
pub use line::baud::{resolve_baud, BaudSelection, CUSTOM_PLACEHOLDER_BAUD, STANDARD_BAUD_RATES};
pub use line::config::{Capabilities, DataBits, LineConfig, LineError, LinePlan, Parity};
pub use line::modem::{LineStateSnapshot, ModemLines};
pub use session::{HangupOutcome, IdleOutcome, RelayPhase, SessionState, Timeout};
pub use translate::{InboundCarriageReturn, OutboundNewline, Translated, TranslationPolicy};
