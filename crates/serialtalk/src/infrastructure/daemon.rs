//! Detaching into the background.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("can't detach into background: {0}")]
    Detach(#[source] io::Error),
}

/// Forks, leaves the parent, and starts a new session.
///
/// The working directory is kept; stdin, stdout and stderr are redirected to
/// `/dev/null`.  Call this only after the serial device is configured so
/// setup errors still reach the terminal.
///
/// # Errors
///
/// Returns [`DaemonError::Detach`] if the fork fails.
#[cfg(target_os = "linux")]
pub fn detach() -> Result<(), DaemonError> {
    tracing::info!("detaching into background");
    nix::unistd::daemon(true, false).map_err(|e| DaemonError::Detach(e.into()))
}

#[cfg(not(target_os = "linux"))]
pub fn detach() -> Result<(), DaemonError> {
    Err(DaemonError::Detach(io::Error::new(
        io::ErrorKind::Unsupported,
        "background mode needs Linux",
    )))
}
