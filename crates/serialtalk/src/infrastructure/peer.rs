//! The peer end of the relay: the terminal, or one TCP connection.
//!
//! Both kinds are read one byte at a time straight from the descriptor.
//! Nothing here goes through `std::io::Stdin`'s internal buffer, because a
//! buffered byte would be invisible to the readiness wait.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsFd, BorrowedFd};

/// The other end of the serial relay.
#[derive(Debug)]
pub enum Peer {
    /// Duplicates of the process's stdin and stdout.
    Stdio { input: File, output: File },
    /// An accepted TCP connection.
    Socket { stream: TcpStream, addr: SocketAddr },
}

impl Peer {
    /// Wraps duplicates of file descriptors 0 and 1.
    ///
    /// # Errors
    ///
    /// Returns an error if either descriptor cannot be duplicated.
    pub fn stdio() -> io::Result<Self> {
        let input = File::from(io::stdin().as_fd().try_clone_to_owned()?);
        let output = File::from(io::stdout().as_fd().try_clone_to_owned()?);
        Ok(Peer::Stdio { input, output })
    }

    pub fn socket(stream: TcpStream, addr: SocketAddr) -> Self {
        Peer::Socket { stream, addr }
    }

    /// The descriptor to watch for incoming data.
    pub fn input_fd(&self) -> BorrowedFd<'_> {
        match self {
            Peer::Stdio { input, .. } => input.as_fd(),
            Peer::Socket { stream, .. } => stream.as_fd(),
        }
    }

    /// Reads one byte; `Ok(None)` at end-of-file.
    ///
    /// Interrupted reads are retried.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            let n = match self {
                Peer::Stdio { input, .. } => input.read(&mut buf),
                Peer::Socket { stream, .. } => stream.read(&mut buf),
            };
            match n {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes one byte, unbuffered.
    pub fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        match self {
            Peer::Stdio { output, .. } => output.write_all(&[byte]),
            Peer::Socket { stream, .. } => stream.write_all(&[byte]),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Stdio { .. } => f.write_str("stdio"),
            Peer::Socket { addr, .. } => write!(f, "tcp:{addr}"),
        }
    }
}
