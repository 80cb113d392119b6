use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a ping or traceroute session
///
/// Probe timeouts are not errors, they are recorded as lost probes. A failed send is an error, but
/// the sessions only give up on it if [`Error::is_fatal`] says the socket is unusable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("could not resolve host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("host {0} has no IPv4 address")]
    NoIpv4Address(String),

    #[error("could not open raw ICMP socket: {0}")]
    Socket(#[source] io::Error),

    #[error("could not set time to live {ttl}: {source}")]
    Ttl {
        ttl: u8,
        #[source]
        source: io::Error,
    },

    #[error("could not transmit echo request: {0}")]
    Transmit(#[source] io::Error),

    #[error("could not read from socket: {0}")]
    Receive(#[source] io::Error),

    #[error("could not install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("no probes sent")]
    NoProbesSent,
}

impl Error {
    /// Return `true` if the session cannot continue after this error
    ///
    /// Transmit failures are usually transient (no route, buffer space exhausted) and only cost the
    /// current probe. A socket we are not permitted to use will not recover, though.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transmit(e) => matches!(
                e.kind(),
                io::ErrorKind::PermissionDenied | io::ErrorKind::Unsupported
            ),
            _ => true,
        }
    }

    /// Return `true` if raw sockets were refused for lack of privilege
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Socket(e) | Self::Transmit(e) => e.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}
