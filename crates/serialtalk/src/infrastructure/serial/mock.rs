//! Mock serial line for unit testing.
//!
//! Records every [`LineControl`] call in order and keeps a simulated modem
//! line register, so tests can check both the sequence of operations and
//! their end result without a tty.

use std::io;

use serialtalk_core::{LinePlan, ModemLines};

use crate::application::configure_line::LineControl;

/// One recorded call on [`MockLineControl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCall {
    Commit(LinePlan),
    BaudBase,
    SetDivisor(u32),
    SetBlocking,
    QueryLines,
    ClearLines(ModemLines),
    SetLines(ModemLines),
}

/// A mock implementation of [`LineControl`].
#[derive(Debug)]
pub struct MockLineControl {
    calls: Vec<LineCall>,
    baud_base: u32,
    lines: ModemLines,
    committed: Option<LinePlan>,
    commit_fails: bool,
    set_blocking_fails: bool,
}

impl MockLineControl {
    /// A line with the usual 16550 base clock of 115200.
    pub fn new() -> Self {
        Self::with_baud_base(115_200)
    }

    pub fn with_baud_base(baud_base: u32) -> Self {
        Self {
            calls: Vec::new(),
            baud_base,
            lines: ModemLines::empty(),
            committed: None,
            commit_fails: false,
            set_blocking_fails: false,
        }
    }

    /// Makes [`LineControl::commit`] fail with `EINVAL`.
    pub fn fail_commit(&mut self) {
        self.commit_fails = true;
    }

    /// Makes [`LineControl::set_blocking`] fail.
    pub fn fail_set_blocking(&mut self) {
        self.set_blocking_fails = true;
    }

    pub fn calls(&self) -> &[LineCall] {
        &self.calls
    }

    /// Current simulated modem line state.
    pub fn lines(&self) -> ModemLines {
        self.lines
    }

    /// The last successfully committed plan.
    pub fn committed(&self) -> Option<&LinePlan> {
        self.committed.as_ref()
    }
}

impl Default for MockLineControl {
    fn default() -> Self {
        Self::new()
    }
}

impl LineControl for MockLineControl {
    fn commit(&mut self, plan: &LinePlan) -> io::Result<()> {
        self.calls.push(LineCall::Commit(*plan));
        if self.commit_fails {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        self.committed = Some(*plan);
        Ok(())
    }

    fn baud_base(&mut self) -> io::Result<u32> {
        self.calls.push(LineCall::BaudBase);
        Ok(self.baud_base)
    }

    fn set_custom_divisor(&mut self, divisor: u32) -> io::Result<()> {
        self.calls.push(LineCall::SetDivisor(divisor));
        Ok(())
    }

    fn set_blocking(&mut self) -> io::Result<()> {
        self.calls.push(LineCall::SetBlocking);
        if self.set_blocking_fails {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(())
    }

    fn modem_lines(&mut self) -> io::Result<ModemLines> {
        self.calls.push(LineCall::QueryLines);
        Ok(self.lines)
    }

    fn clear_modem_lines(&mut self, lines: ModemLines) -> io::Result<()> {
        self.calls.push(LineCall::ClearLines(lines));
        self.lines = self.lines.apply(lines, ModemLines::empty());
        Ok(())
    }

    fn set_modem_lines(&mut self, lines: ModemLines) -> io::Result<()> {
        self.calls.push(LineCall::SetLines(lines));
        self.lines = self.lines.apply(ModemLines::empty(), lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_line_tracks_modem_register() {
        // Arrange
        let mut line = MockLineControl::new();

        // Act
        line.set_modem_lines(ModemLines(ModemLines::DTR | ModemLines::RTS))
            .expect("set");
        line.clear_modem_lines(ModemLines(ModemLines::RTS)).expect("clear");

        // Assert
        assert_eq!(line.lines(), ModemLines(ModemLines::DTR));
        assert_eq!(line.calls().len(), 2);
    }

    #[test]
    fn test_mock_line_failed_commit_is_recorded_but_not_kept() {
        let mut line = MockLineControl::new();
        line.fail_commit();
        let plan = serialtalk_core::LineConfig::default()
            .plan(serialtalk_core::Capabilities::for_current_platform())
            .expect("plan");

        assert!(line.commit(&plan).is_err());
        assert!(line.committed().is_none());
        assert_eq!(line.calls().len(), 1);
    }
}
