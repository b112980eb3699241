//! Relay session state machine.
//!
//! A session starts in [`RelayPhase::Active`], waiting for readiness on both
//! the serial line and the peer.  It ends in [`RelayPhase::Terminated`].  In
//! between it may pass through [`RelayPhase::PeerHalfClosed`]: the peer has
//! hung up, but the serial side is still drained for a bounded idle window so
//! the device's last replies are not lost.
//!
//! ```text
//!            peer hang-up, timeout > 0
//!   Active ─────────────────────────────▶ PeerHalfClosed
//!     │  │                                       │
//!     │  │ peer hang-up, timeout ≤ 0             │ idle budget spent
//!     │  ▼                                       ▼
//!     │ Terminated ◀──────────────────────── Terminated
//!     │
//!     └─ single pass finished, timeout = 0 ──▶ Terminated
//! ```
//!
//! The machine is pure: the transfer loop reports what the readiness wait
//! returned and asks what to do next.

use std::time::Duration;

use tracing::debug;

/// How long one readiness wait may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until something happens.
    Forever,
    /// Do not block: one readiness check, then the session ends.
    Immediate,
    /// Block for at most this many milliseconds per wait.
    Millis(u32),
}

impl Timeout {
    /// Interprets a signed millisecond count: negative waits forever, zero is
    /// a single non-blocking pass, positive bounds each wait.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms < 0 => Timeout::Forever,
            0 => Timeout::Immediate,
            ms => Timeout::Millis(u32::try_from(ms).unwrap_or(u32::MAX)),
        }
    }

    /// Replaces [`Timeout::Forever`] with the idle-after-close wait, if any.
    ///
    /// Without a bounded wait the relay could never notice that the idle
    /// window after a peer hang-up has elapsed.
    pub fn with_idle_fallback(self, idle_after_close_ms: u32) -> Self {
        match self {
            Timeout::Forever if idle_after_close_ms > 0 => Timeout::Millis(idle_after_close_ms),
            other => other,
        }
    }

    /// Signed millisecond form (`-1` for forever), as `poll(2)` expects.
    pub fn as_millis(&self) -> i32 {
        match *self {
            Timeout::Forever => -1,
            Timeout::Immediate => 0,
            Timeout::Millis(ms) => i32::try_from(ms).unwrap_or(i32::MAX),
        }
    }

    /// The wait as a [`Duration`], or `None` for [`Timeout::Forever`].
    pub fn as_duration(&self) -> Option<Duration> {
        match *self {
            Timeout::Forever => None,
            Timeout::Immediate => Some(Duration::ZERO),
            Timeout::Millis(ms) => Some(Duration::from_millis(u64::from(ms))),
        }
    }
}

/// Lifecycle phase of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    /// Serial line and peer are both armed.
    Active,
    /// The peer hung up; only the serial line is armed.
    PeerHalfClosed,
    /// The session is over.
    Terminated,
}

/// What happened after a wait returned no events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// Nothing to do; keep waiting.  Status snapshots are taken here.
    Tick,
    /// The idle window after a peer hang-up has elapsed.
    DrainExpired,
}

/// What happened after the peer hung up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangupOutcome {
    /// Keep draining the serial line for the idle window.
    Draining,
    /// End the session now.
    Ended,
}

/// Mutable per-session bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionState {
    timeout: Timeout,
    idle_remaining_ms: i64,
    phase: RelayPhase,
}

impl SessionState {
    /// Starts an [`RelayPhase::Active`] session.
    ///
    /// `idle_after_close_ms` is how long the serial side keeps being drained
    /// after the peer hangs up.  It is consumed in steps of the timeout, so
    /// the effective window is at least one wait long.
    pub fn new(timeout: Timeout, idle_after_close_ms: u32) -> Self {
        Self {
            timeout,
            idle_remaining_ms: i64::from(idle_after_close_ms),
            phase: RelayPhase::Active,
        }
    }

    pub fn phase(&self) -> RelayPhase {
        self.phase
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    /// Remaining idle budget in milliseconds; may be negative once spent.
    pub fn idle_remaining_ms(&self) -> i64 {
        self.idle_remaining_ms
    }

    /// Whether the peer descriptor takes part in the next wait.
    pub fn peer_armed(&self) -> bool {
        self.phase == RelayPhase::Active
    }

    /// Number of descriptors in the next wait (2 while active, 1 after the
    /// peer hung up).
    pub fn armed_count(&self) -> usize {
        if self.peer_armed() {
            2
        } else {
            1
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == RelayPhase::Terminated
    }

    /// Records a wait that returned no events.
    pub fn on_idle(&mut self) -> IdleOutcome {
        if self.phase != RelayPhase::PeerHalfClosed {
            return IdleOutcome::Tick;
        }

        self.idle_remaining_ms -= i64::from(self.timeout.as_millis().max(0));
        if matches!(self.timeout, Timeout::Millis(_)) && self.idle_remaining_ms <= 0 {
            debug!("idle window after peer hang-up elapsed");
            self.phase = RelayPhase::Terminated;
            IdleOutcome::DrainExpired
        } else {
            IdleOutcome::Tick
        }
    }

    /// Records that the peer will send no more data.
    ///
    /// With a positive timeout the session keeps draining the serial line;
    /// with a zero or infinite timeout it ends immediately.  Repeated calls
    /// after the first have no further effect.
    pub fn on_peer_hangup(&mut self) -> HangupOutcome {
        match self.phase {
            RelayPhase::Active => match self.timeout {
                Timeout::Millis(ms) => {
                    debug!(timeout_ms = ms, idle_ms = self.idle_remaining_ms, "peer hung up; draining serial line");
                    self.phase = RelayPhase::PeerHalfClosed;
                    HangupOutcome::Draining
                }
                Timeout::Forever | Timeout::Immediate => {
                    debug!("peer hung up; ending session");
                    self.phase = RelayPhase::Terminated;
                    HangupOutcome::Ended
                }
            },
            RelayPhase::PeerHalfClosed => HangupOutcome::Draining,
            RelayPhase::Terminated => HangupOutcome::Ended,
        }
    }

    /// Called once every readiness event of an iteration has been handled.
    ///
    /// A zero timeout allows exactly one pass.
    pub fn end_of_pass(&mut self) {
        if self.timeout == Timeout::Immediate && self.phase != RelayPhase::Terminated {
            debug!("single non-blocking pass finished");
            self.phase = RelayPhase::Terminated;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
