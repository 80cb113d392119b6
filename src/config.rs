//! Session configuration
//!
//! Both configurations are built once from the command line and handed to the sessions by
//! reference. Sessions never modify them.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Payload size of ping probes if none is given
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

/// Largest payload that fits into an IPv4 datagram next to a 20 byte IP and the ICMP header
pub const MAX_PAYLOAD_SIZE: usize = 65_507;

/// Payload size of traceroute probes
pub const TRACE_PAYLOAD_SIZE: usize = 32;

/// Number of probes per traceroute hop if none is given
pub const DEFAULT_PROBES_PER_HOP: u16 = 3;

/// Traceroute gives up after this many hops
pub const MAX_HOPS: u8 = 30;

/// How long to wait for the reply to a single probe
///
/// This bounds each blocking receive. It is independent of the overall ping deadline, which is
/// only checked between probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Destination for ping and traceroute
///
/// The user can choose to either provide an IPv4 address or a host name. Host names are resolved
/// before any probe is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dest {
    Ip(Ipv4Addr),
    Host(String),
}

impl Dest {
    /// Interpret user input as an address if possible, as a host name otherwise
    ///
    /// If the input is not a valid destination, it will fail during DNS resolution.
    pub fn parse(input: &str) -> Self {
        match input.parse::<Ipv4Addr>() {
            Ok(ip) => Self::Ip(ip),
            Err(_) => Self::Host(input.to_string()),
        }
    }
}

impl fmt::Display for Dest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{}", ip),
            Self::Host(host) => write!(f, "{}", host),
        }
    }
}

/// Ping session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingConfig {
    pub dest: Dest,
    /// Payload bytes per echo request
    pub size: usize,
    /// Number of probes to send, unbounded if `None`
    pub count: Option<u64>,
    /// Pause after each answered probe
    pub interval: Duration,
    /// Upper bound on the wall-clock duration of the session, unbounded if `None`
    pub deadline: Option<Duration>,
}

impl PingConfig {
    pub fn new(dest: Dest) -> Self {
        Self {
            dest,
            size: DEFAULT_PAYLOAD_SIZE,
            count: None,
            interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

/// Traceroute session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    pub dest: Dest,
    pub probes_per_hop: u16,
    pub max_hops: u8,
    /// Look up host names of the hop addresses
    pub resolve_names: bool,
    /// Print how many probes of each hop went unanswered
    pub show_unanswered: bool,
}

impl TraceConfig {
    pub fn new(dest: Dest) -> Self {
        Self {
            dest,
            probes_per_hop: DEFAULT_PROBES_PER_HOP,
            max_hops: MAX_HOPS,
            resolve_names: true,
            show_unanswered: false,
        }
    }
}
