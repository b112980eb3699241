//! Applies a [`LineConfig`] to a serial line.
//!
//! # Order of operations
//!
//! ```text
//! plan ─▶ commit attributes ─▶ custom divisor ─▶ blocking reads
//!      ─▶ [snapshot] ─▶ clear lines ─▶ set lines ─▶ [snapshot]
//! ```
//!
//! The divisor is programmed after the attributes because committing the
//! placeholder rate is what tells the driver to look at the divisor at all.
//! Lines are cleared before they are set, so a line named in both masks ends
//! up asserted.  The snapshots are only taken with status output enabled,
//! and the second one only if a line was actually changed.

use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

use serialtalk_core::line::baud::custom_divisor;
use serialtalk_core::{Capabilities, LineConfig, LineError, LinePlan, LineStateSnapshot, ModemLines, Timestamp};

use crate::application::transfer::RelayObserver;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that stop the line from being configured.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// The requested configuration is not valid on this platform.
    #[error(transparent)]
    Plan(#[from] LineError),

    /// The driver rejected the line attributes.
    #[error("can't set line attributes: {0}")]
    Commit(#[source] io::Error),

    /// The custom baud rate could not be programmed.
    #[error("can't set custom divisor for {rate} baud: {source}")]
    Divisor {
        rate: u32,
        #[source]
        source: io::Error,
    },
}

// ── Port ──────────────────────────────────────────────────────────────────────

/// Low-level control of a serial line.
///
/// Implemented by [`crate::infrastructure::serial::SerialDevice`] and by
/// [`crate::infrastructure::serial::mock::MockLineControl`] for tests.
pub trait LineControl {
    /// Writes baud rates, framing, parity and raw mode in one step.
    fn commit(&mut self, plan: &LinePlan) -> io::Result<()>;

    /// Reads the UART base clock used for custom divisors.
    fn baud_base(&mut self) -> io::Result<u32>;

    /// Programs a custom clock divisor and enables it.
    fn set_custom_divisor(&mut self, divisor: u32) -> io::Result<()>;

    /// Switches the descriptor from non-blocking to blocking reads.
    fn set_blocking(&mut self) -> io::Result<()>;

    fn modem_lines(&mut self) -> io::Result<ModemLines>;

    fn clear_modem_lines(&mut self, lines: ModemLines) -> io::Result<()>;

    fn set_modem_lines(&mut self, lines: ModemLines) -> io::Result<()>;
}

// ── Use case ──────────────────────────────────────────────────────────────────

/// What [`ConfigureLineUseCase::run`] applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredLine {
    pub plan: LinePlan,
    /// The divisor programmed for a custom rate, if any.
    pub divisor: Option<u32>,
}

/// Configures a serial line from a [`LineConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ConfigureLineUseCase {
    caps: Capabilities,
    show_state: bool,
}

impl ConfigureLineUseCase {
    pub fn new(caps: Capabilities, show_state: bool) -> Self {
        Self { caps, show_state }
    }

    /// Applies `config` to `line`.
    ///
    /// Applying the same configuration twice leaves the line in the same
    /// state as applying it once.
    ///
    /// # Errors
    ///
    /// - [`ConfigureError::Plan`] for an illegal baud rate or framing.
    /// - [`ConfigureError::Commit`] if the attributes are rejected.
    /// - [`ConfigureError::Divisor`] if a custom rate cannot be programmed
    ///   or is faster than the UART clock.
    ///
    /// Failing to switch to blocking reads or to change the modem lines is
    /// logged but not fatal.
    pub fn run<L, O>(&self, line: &mut L, config: &LineConfig, observer: &mut O) -> Result<ConfiguredLine, ConfigureError>
    where
        L: LineControl + ?Sized,
        O: RelayObserver + ?Sized,
    {
        let plan = config.plan(self.caps)?;
        debug!(?plan, "line plan resolved");

        line.commit(&plan).map_err(ConfigureError::Commit)?;

        let divisor = match plan.custom_rate() {
            Some(rate) => Some(self.program_divisor(line, rate)?),
            None => None,
        };

        if let Err(e) = line.set_blocking() {
            warn!("can't switch serial line to blocking reads: {e}");
        }

        if self.show_state {
            snapshot(line, observer);
        }
        if !plan.clear_lines.is_empty() {
            if let Err(e) = line.clear_modem_lines(plan.clear_lines) {
                warn!(lines = %plan.clear_lines, "can't clear modem lines: {e}");
            }
        }
        if !plan.set_lines.is_empty() {
            if let Err(e) = line.set_modem_lines(plan.set_lines) {
                warn!(lines = %plan.set_lines, "can't set modem lines: {e}");
            }
        }
        if self.show_state && plan.changes_lines() {
            snapshot(line, observer);
        }

        info!(
            input = plan.input.effective(),
            output = plan.output.effective(),
            bits = plan.data_bits.count(),
            parity = plan.parity.label(),
            "serial line configured"
        );
        Ok(ConfiguredLine { plan, divisor })
    }

    fn program_divisor<L>(&self, line: &mut L, rate: u32) -> Result<u32, ConfigureError>
    where
        L: LineControl + ?Sized,
    {
        let baud_base = line
            .baud_base()
            .map_err(|source| ConfigureError::Divisor { rate, source })?;
        let divisor = custom_divisor(baud_base, rate).ok_or(LineError::UnreachableBaud {
            requested: rate,
            baud_base,
        })?;
        line.set_custom_divisor(divisor)
            .map_err(|source| ConfigureError::Divisor { rate, source })?;
        debug!(rate, baud_base, divisor, "custom divisor programmed");
        Ok(divisor)
    }
}

fn snapshot<L, O>(line: &mut L, observer: &mut O)
where
    L: LineControl + ?Sized,
    O: RelayObserver + ?Sized,
{
    match line.modem_lines() {
        Ok(lines) => observer.line_state(LineStateSnapshot {
            at: Timestamp::now(),
            lines,
        }),
        Err(e) => warn!("can't query modem lines: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
