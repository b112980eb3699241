//! Relay configuration.
//!
//! [`RelayConfig`] is the single source of truth for one run of the relay.  It
//! is built once in `main.rs` from the command line (and the optional TOML
//! defaults file) and then passed by reference to every component; nothing
//! reads settings from process-global state.

use std::path::PathBuf;

use serialtalk_core::{LineConfig, Timeout, TranslationPolicy};

/// Who sits on the other end of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerMode {
    /// The process's own stdin/stdout.
    Terminal,
    /// One TCP connection at a time, accepted on this port on all interfaces.
    Listen(u16),
}

/// How stdin should be switched when it is a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdinMode {
    /// Line-buffered input (`ICANON`).  `false` delivers each key at once.
    pub canonical: bool,
    /// Local echo of typed characters (`ECHO`).
    pub echo: bool,
}

impl Default for StdinMode {
    fn default() -> Self {
        Self {
            canonical: true,
            echo: true,
        }
    }
}

impl StdinMode {
    /// Returns `true` when stdin has to be reconfigured at all.
    pub fn is_changed(&self) -> bool {
        !self.canonical || !self.echo
    }
}

/// Everything the transfer loop needs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    pub translation: TranslationPolicy,
    /// Per-wait timeout; already adjusted by [`Timeout::with_idle_fallback`].
    pub timeout: Timeout,
    /// How long the serial side keeps draining after the peer hangs up.
    pub idle_after_close_ms: u32,
    /// Emit a modem-line snapshot on every idle wait.
    pub show_state: bool,
    /// Emit a timestamped trace line for every byte moved.
    pub trace_bytes: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            translation: TranslationPolicy::default(),
            timeout: Timeout::Forever,
            idle_after_close_ms: 0,
            show_state: false,
            trace_bytes: false,
        }
    }
}

/// All runtime configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0`.
    pub device: PathBuf,
    pub line: LineConfig,
    pub relay: RelayOptions,
    /// Print the parameter block before relaying.
    pub verbose: bool,
    /// Send a single ctrl-c byte after setup and exit.
    pub send_interrupt: bool,
    pub peer: PeerMode,
    /// Detach into the background after the device is configured.
    pub background: bool,
    pub stdin_mode: StdinMode,
}

impl RelayConfig {
    /// A configuration with every default for `device`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serialtalk::domain::{PeerMode, RelayConfig};
    ///
    /// let cfg = RelayConfig::for_device("/dev/ttyUSB0");
    /// assert_eq!(cfg.line.input_baud, 9600);
    /// assert_eq!(cfg.peer, PeerMode::Terminal);
    /// ```
    pub fn for_device(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            line: LineConfig::default(),
            relay: RelayOptions::default(),
            verbose: false,
            send_interrupt: false,
            peer: PeerMode::Terminal,
            background: false,
            stdin_mode: StdinMode::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
