use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::packet::{ProbeId, ReplyPacket, ResponseStatus};

/// Large enough for any IPv4 datagram, so replies to big payloads are never truncated
const RECV_BUFFER_SIZE: usize = 65_535;

/// Metadata of a reply that answered a probe
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Host that sent the reply
    pub source: Ipv4Addr,
    /// TTL of the reply datagram on arrival
    pub ttl: u8,
    /// Raw ICMP type field
    pub icmp_type: u8,
    pub status: ResponseStatus,
    /// Length of the ICMP payload
    pub size: usize,
    /// Time between the send and the arrival of the reply
    pub rtt: Duration,
}

impl Reply {
    fn from_packet(packet: &ReplyPacket, rtt: Duration) -> Self {
        Self {
            source: packet.get_source(),
            ttl: packet.get_ttl(),
            icmp_type: packet.get_icmp_type(),
            status: packet.get_type(),
            size: packet.get_size(),
            rtt,
        }
    }

    /// Return `true` if this is an echo reply, i.e. the probed host itself answered
    pub fn is_echo_reply(&self) -> bool {
        self.status == ResponseStatus::Received
    }
}

/// Outcome of waiting for a reply
///
/// Running into the timeout is an expected outcome, not a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Reply(Reply),
    TimedOut,
}

/// Sends probes and waits for their replies
///
/// Every blocking call takes its bound explicitly. Implementations are used by exactly one session
/// at a time.
pub trait Transport {
    /// Set the time to live for all packets sent after this call
    fn set_ttl(&mut self, ttl: u8) -> Result<()>;

    /// Send a complete ICMP packet to `dest`
    fn send(&mut self, packet: &[u8], dest: Ipv4Addr) -> Result<()>;

    /// Wait up to `timeout` for the reply to `probe`
    fn receive(&mut self, timeout: Duration, probe: ProbeId) -> Result<Received>;
}

/// Transport over a raw ICMP socket
///
/// The socket is opened on construction and closed when the transport is dropped, which happens
/// on every exit path of the owning session, including errors and interrupts.
///
/// Raw sockets need elevated privileges (root or `CAP_NET_RAW` on Linux). Opening the socket
/// without them fails right away and is not retried.
pub struct RawTransport {
    socket: Socket,
    buffer: Vec<u8>,
    departure: Option<Instant>,
}

impl RawTransport {
    /// Open a raw `AF_INET` socket for ICMP
    ///
    /// # Errors
    ///
    /// Returns `Error::Socket` if the operating system refuses the socket.
    pub fn open() -> Result<Self> {
        trace!("Opening raw ICMP socket");

        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(Error::Socket)?;

        Ok(Self {
            socket,
            buffer: vec![0u8; RECV_BUFFER_SIZE],
            departure: None,
        })
    }

    /// Read one datagram, waiting at most `timeout`
    ///
    /// Returns `Ok(None)` once the timeout has elapsed.
    fn read_datagram(&mut self, timeout: Duration) -> Result<Option<usize>> {
        let timeout = match read_timeout(timeout) {
            Some(timeout) => timeout,
            None => return Ok(None),
        };
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(Error::Receive)?;

        match self.socket.read(&mut self.buffer) {
            Ok(len) => Ok(Some(len)),
            Err(e) if is_timeout(&e) => Ok(None),
            // A signal arrived while blocking, let the caller retry with the remaining time
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Some(0)),
            Err(e) => Err(Error::Receive(e)),
        }
    }
}

impl Transport for RawTransport {
    fn set_ttl(&mut self, ttl: u8) -> Result<()> {
        debug!("Set time to live: {}", ttl);
        self.socket
            .set_ttl(u32::from(ttl))
            .map_err(|source| Error::Ttl { ttl, source })
    }

    fn send(&mut self, packet: &[u8], dest: Ipv4Addr) -> Result<()> {
        let addr = SockAddr::from(SocketAddrV4::new(dest, 0));

        // Stop time and send packet out into the aether
        let departure = Instant::now();
        self.socket
            .send_to(packet, &addr)
            .map_err(Error::Transmit)?;
        self.departure = Some(departure);
        Ok(())
    }

    /// Wait for the reply to `probe`
    ///
    /// The raw socket sees every ICMP message arriving at the host. Datagrams that cannot be
    /// parsed or belong to another probe are skipped, until the matching reply shows up or the
    /// timeout elapses.
    fn receive(&mut self, timeout: Duration, probe: ProbeId) -> Result<Received> {
        let started = Instant::now();
        let departure = self.departure.unwrap_or(started);
        let deadline = started + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let len = match self.read_datagram(remaining)? {
                Some(len) => len,
                None => return Ok(Received::TimedOut),
            };
            let arrival = Instant::now();

            if let Some(reply) = match_reply(&self.buffer[..len], probe, departure, arrival) {
                return Ok(Received::Reply(reply));
            }
        }
    }
}

impl Drop for RawTransport {
    fn drop(&mut self) {
        trace!("Closing raw ICMP socket");
    }
}

/// Socket read timeout for the time left until a receive deadline
///
/// The socket only keeps whole microseconds and takes a zero timeout as "block forever", so
/// anything below one microsecond counts as elapsed.
fn read_timeout(remaining: Duration) -> Option<Duration> {
    if remaining < Duration::from_micros(1) {
        None
    } else {
        Some(remaining)
    }
}

/// Decide whether a datagram answers `probe`
///
/// Returns the reply with its round-trip time measured from `departure` to `arrival`, or `None`
/// if the datagram has to be skipped.
fn match_reply(
    datagram: &[u8],
    probe: ProbeId,
    departure: Instant,
    arrival: Instant,
) -> Option<Reply> {
    match ReplyPacket::parse(datagram) {
        Some(packet) if packet.answers(probe) => {
            let rtt = arrival.saturating_duration_since(departure);
            Some(Reply::from_packet(&packet, rtt))
        }
        Some(packet) => {
            trace!(
                "Skipping ICMP type {} from {} (id={} seq={})",
                packet.get_icmp_type(),
                packet.get_source(),
                packet.get_id(),
                packet.get_sequence()
            );
            None
        }
        None => {
            if !datagram.is_empty() {
                trace!("Skipping unparseable datagram of {} bytes", datagram.len());
            }
            None
        }
    }
}

/// Read timeouts surface as `WouldBlock` on unix and `TimedOut` on windows
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::tests::datagram;

    #[test]
    fn read_timeouts_are_recognised() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn sub_microsecond_timeouts_are_elapsed() {
        assert_eq!(read_timeout(Duration::from_secs(0)), None);
        assert_eq!(read_timeout(Duration::from_nanos(1)), None);
        assert_eq!(read_timeout(Duration::from_nanos(999)), None);
        assert_eq!(read_timeout(Duration::from_micros(1)), Some(Duration::from_micros(1)));
        assert_eq!(read_timeout(Duration::from_secs(3)), Some(Duration::from_secs(3)));
    }

    #[test]
    fn skip_datagrams_of_other_probes() {
        let probe = ProbeId { identifier: 0x4242, sequence: 7 };
        let host = Ipv4Addr::new(203, 0, 113, 9);
        let departure = Instant::now();
        let arrival = departure + Duration::from_millis(15);

        let echo = |ty: u8, id: u16, seq: u16| {
            let mut icmp = vec![ty, 0, 0, 0];
            icmp.extend_from_slice(&id.to_be_bytes());
            icmp.extend_from_slice(&seq.to_be_bytes());
            icmp.extend_from_slice(&[0xaa; 16]);
            icmp
        };

        let incoming = vec![
            // Empty read after an interrupted system call
            Vec::new(),
            vec![0xff; 7],
            // Another ping process on the same host
            datagram(host, 50, 0, &echo(0, 0x1111, 7)),
            // A late reply to an earlier probe of ours
            datagram(host, 50, 0, &echo(0, 0x4242, 6)),
            // Our own request seen on loopback
            datagram(Ipv4Addr::LOCALHOST, 64, 0, &echo(8, 0x4242, 7)),
            datagram(host, 50, 0, &echo(0, 0x4242, 7)),
            datagram(host, 50, 0, &echo(0, 0x4242, 7)),
        ];

        let matched: Vec<(usize, Reply)> = incoming
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| match_reply(raw, probe, departure, arrival).map(|r| (i, r)))
            .collect();

        assert_eq!(matched.len(), 2);
        let (index, reply) = &matched[0];
        assert_eq!(*index, 5);
        assert_eq!(reply.source, host);
        assert_eq!(reply.ttl, 50);
        assert_eq!(reply.size, 16);
        assert_eq!(reply.rtt, Duration::from_millis(15));
        assert!(reply.is_echo_reply());
    }

    #[test]
    fn reply_from_packet() {
        let icmp = [0, 0, 0, 0, 0x12, 0x34, 0, 5, 1, 2, 3, 4];
        let raw = datagram(Ipv4Addr::new(203, 0, 113, 9), 50, 0, &icmp);
        let packet = ReplyPacket::parse(&raw).unwrap();

        let reply = Reply::from_packet(&packet, Duration::from_millis(12));

        assert_eq!(reply.source, Ipv4Addr::new(203, 0, 113, 9));
        assert_eq!(reply.ttl, 50);
        assert_eq!(reply.icmp_type, 0);
        assert_eq!(reply.size, 4);
        assert_eq!(reply.rtt, Duration::from_millis(12));
        assert!(reply.is_echo_reply());
    }

    #[test]
    fn receive_without_privileges_fails_cleanly() {
        // Unprivileged test runs cannot open raw sockets; privileged ones must get a usable socket
        match RawTransport::open() {
            Ok(mut transport) => {
                let probe = ProbeId { identifier: 0, sequence: 0 };
                let outcome = transport.receive(Duration::from_secs(0), probe).unwrap();
                assert_eq!(outcome, Received::TimedOut);

                // Must not turn into a blocking read without timeout
                let outcome = transport.receive(Duration::from_nanos(500), probe).unwrap();
                assert_eq!(outcome, Received::TimedOut);
            }
            Err(e) => assert!(matches!(e, Error::Socket(_))),
        }
    }
}
