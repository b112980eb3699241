//! TCP listen mode: serve the serial line to one connection at a time.
//!
//! The accept loop is strictly serial.  While a session runs, further clients
//! wait in the kernel's backlog; when the session ends the connection is
//! dropped and the next client is accepted.  The serial device stays open
//! and configured across sessions, until a session reports that it went
//! away.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};

use nix::libc;
use thiserror::Error;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::application::transfer::{EndReason, RelayError, SessionSummary};

/// Error type for listen mode.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The listening socket itself is no longer usable.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// How the accept loop reacts to a failed `accept(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptFailure {
    /// The next accept may succeed (aborted handshake, descriptor limit, ...).
    Transient,
    /// The listener is broken; retrying would spin forever.
    Fatal,
}

/// Classifies an accept error.
///
/// `EBADF`, `ENOTSOCK` and `EINVAL` mean the listening descriptor is invalid
/// or not listening; everything else is retried.
pub fn classify_accept_error(e: &io::Error) -> AcceptFailure {
    match e.raw_os_error() {
        Some(libc::EBADF | libc::ENOTSOCK | libc::EINVAL) => AcceptFailure::Fatal,
        _ => AcceptFailure::Transient,
    }
}

/// Binds a listener on `port` on all IPv4 interfaces.
///
/// # Errors
///
/// Returns [`NetworkError::BindFailed`] if the port is in use or not
/// permitted.
pub fn bind(port: u16) -> Result<TcpListener, NetworkError> {
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    let listener =
        TcpListener::bind(addr).map_err(|source| NetworkError::BindFailed { addr, source })?;
    info!("listening on {addr}");
    Ok(listener)
}

/// Accepts connections one at a time and hands each to `session`.
///
/// Runs until a session ends with [`EndReason::SerialHangup`] (the device is
/// gone, so there is nothing left to serve) or a fatal error occurs.  Each
/// session gets its own id in the log span.
///
/// # Errors
///
/// - [`NetworkError::AcceptFailed`] for a fatal accept error.
/// - [`NetworkError::Relay`] if a session's readiness wait fails.
pub fn serve<F>(listener: &TcpListener, mut session: F) -> Result<(), NetworkError>
where
    F: FnMut(TcpStream, SocketAddr) -> Result<SessionSummary, RelayError>,
{
    loop {
        let (stream, peer_addr) = match listener.accept() {
            Ok(conn) => conn,
            Err(e) => match classify_accept_error(&e) {
                AcceptFailure::Fatal => return Err(NetworkError::AcceptFailed(e)),
                AcceptFailure::Transient => {
                    error!("accept error: {e}");
                    continue;
                }
            },
        };

        let session_id = Uuid::new_v4();
        let span = info_span!("session", id = %session_id, peer = %peer_addr);
        let _guard = span.enter();

        info!("connection accepted");
        let summary = session(stream, peer_addr)?;
        info!(
            to_serial = summary.to_serial,
            to_peer = summary.to_peer,
            "connection closed"
        );

        if summary.reason == EndReason::SerialHangup {
            warn!("serial device gone; accept loop stopped");
            return Ok(());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
