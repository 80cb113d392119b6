use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::icmp::{IcmpPacket, IcmpType};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use std::net::Ipv4Addr;

pub use request::EchoRequestBuilder;

mod request;

/// Length of the ICMP echo header: type, code, checksum, identifier and sequence number
pub const ICMP_HEADER_LEN: usize = 8;

/// Smallest IPv4 header, i.e. one without options
const MIN_IPV4_HEADER_LEN: usize = 20;

/// Identity of a single probe on the wire
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProbeId {
    pub identifier: u16,
    pub sequence: u16,
}

/// Meaning of a received ICMP type
///
/// Only the types relevant to ping and traceroute are told apart. There are many more types
/// officially defined, they all end up as `Unknown`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Echo reply (type 0), only ever sent by the probed host itself
    Received,
    /// Echo request (type 8), seen when probing the local host
    Request,
    /// Time exceeded (type 11), sent by the router that dropped the probe
    Expired,
    /// Destination unreachable (type 3)
    Unreachable,

    // Catch-all for all types that we do not keep track of
    Unknown,
}

#[allow(non_upper_case_globals)]
impl From<IcmpType> for ResponseStatus {
    fn from(ty: IcmpType) -> Self {
        use pnet::packet::icmp::IcmpTypes::*;
        match ty {
            DestinationUnreachable => Self::Unreachable,
            EchoReply => Self::Received,
            EchoRequest => Self::Request,
            TimeExceeded => Self::Expired,
            _ => Self::Unknown,
        }
    }
}

/// An ICMP message after receipt
///
/// Raw ICMP sockets deliver the complete IPv4 datagram. The reply packet does not own it, but
/// only retains what is needed to attribute the message to a probe and to report on it: the
/// sender, the TTL it arrived with, the ICMP type and the echo identifier and sequence number.
///
/// For echo replies the identifier and sequence number are read from the message header. Error
/// messages (time exceeded, destination unreachable) carry them in the quoted header of the
/// original echo request instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPacket {
    source: Ipv4Addr,
    ttl: u8,
    icmp_type: u8,
    status: ResponseStatus,
    id: u16,
    seq: u16,
    size: usize,
}

impl ReplyPacket {
    /// Parse a raw IPv4 datagram
    ///
    /// The header length is taken from the IHL field, so datagrams carrying IP options are parsed
    /// correctly. Returns `None` for anything that is not a well-formed ICMP message or whose
    /// probe identity cannot be recovered.
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        let ip = Ipv4Packet::new(datagram)?;
        if ip.get_version() != 4 || ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
            return None;
        }

        let header_len = usize::from(ip.get_header_length()) * 4;
        if header_len < MIN_IPV4_HEADER_LEN || datagram.len() < header_len + ICMP_HEADER_LEN {
            return None;
        }

        let message = &datagram[header_len..];
        let icmp = IcmpPacket::new(message)?;
        let status = ResponseStatus::from(icmp.get_icmp_type());

        let (id, seq) = match status {
            ResponseStatus::Expired | ResponseStatus::Unreachable => {
                quoted_probe(&message[ICMP_HEADER_LEN..])?
            }
            _ => (
                u16::from_be_bytes([message[4], message[5]]),
                u16::from_be_bytes([message[6], message[7]]),
            ),
        };

        Some(Self {
            source: ip.get_source(),
            ttl: ip.get_ttl(),
            icmp_type: icmp.get_icmp_type().0,
            status,
            id,
            seq,
            size: message.len() - ICMP_HEADER_LEN,
        })
    }

    /// Return `true` if this message answers the given probe
    ///
    /// Echo requests are never answers: on the loopback interface the raw socket also sees the
    /// requests it sent itself.
    pub fn answers(&self, probe: ProbeId) -> bool {
        self.status != ResponseStatus::Request
            && self.id == probe.identifier
            && self.seq == probe.sequence
    }

    /// Get the address of the host that sent the message
    pub fn get_source(&self) -> Ipv4Addr {
        self.source
    }

    /// Get the TTL of the IP datagram on arrival
    pub fn get_ttl(&self) -> u8 {
        self.ttl
    }

    /// Get the raw value of the ICMP type field
    pub fn get_icmp_type(&self) -> u8 {
        self.icmp_type
    }

    /// Get the classified ICMP type
    pub fn get_type(&self) -> ResponseStatus {
        self.status
    }

    /// Get the identifier of the probe this message refers to
    pub fn get_id(&self) -> u16 {
        self.id
    }

    /// Get the sequence number of the probe this message refers to
    pub fn get_sequence(&self) -> u16 {
        self.seq
    }

    /// Get the length of the ICMP payload
    pub fn get_size(&self) -> usize {
        self.size
    }
}

/// Recover identifier and sequence number from the datagram quoted in an ICMP error message
///
/// Routers quote the original IP header plus at least the first 8 bytes of its payload, which is
/// exactly the echo request header.
fn quoted_probe(quoted: &[u8]) -> Option<(u16, u16)> {
    let ip = Ipv4Packet::new(quoted)?;
    let header_len = usize::from(ip.get_header_length()) * 4;
    if header_len < MIN_IPV4_HEADER_LEN {
        return None;
    }
    let echo = EchoRequestPacket::new(quoted.get(header_len..)?)?;
    Some((echo.get_identifier(), echo.get_sequence_number()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Wrap an ICMP message into an IPv4 header with `options` extra bytes of IP options
    pub(crate) fn datagram(source: Ipv4Addr, ttl: u8, options: usize, icmp: &[u8]) -> Vec<u8> {
        assert_eq!(options % 4, 0);
        let header_len = MIN_IPV4_HEADER_LEN + options;
        let total = header_len + icmp.len();

        let mut buf = vec![0u8; header_len];
        buf[0] = 0x40 | (header_len / 4) as u8;
        buf[2..4].copy_from_slice(&(total as u16).to_be_bytes());
        buf[8] = ttl;
        buf[9] = 1;
        buf[12..16].copy_from_slice(&source.octets());
        buf[16..20].copy_from_slice(&[10, 0, 0, 1]);
        buf.extend_from_slice(icmp);
        buf
    }

    fn echo(ty: u8, id: u16, seq: u16, payload: usize) -> Vec<u8> {
        let mut buf = vec![ty, 0, 0, 0];
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&seq.to_be_bytes());
        buf.extend(std::iter::repeat(0xaa).take(payload));
        buf
    }

    fn time_exceeded(id: u16, seq: u16) -> Vec<u8> {
        let original = datagram(Ipv4Addr::new(10, 0, 0, 1), 1, 0, &echo(8, id, seq, 0));
        let mut buf = vec![11, 0, 0, 0, 0, 0, 0, 0];
        buf.extend_from_slice(&original);
        buf
    }

    #[test]
    fn parse_echo_reply() {
        let source = Ipv4Addr::new(192, 0, 2, 7);
        let packet = ReplyPacket::parse(&datagram(source, 57, 0, &echo(0, 0x1234, 3, 56))).unwrap();

        assert_eq!(packet.get_source(), source);
        assert_eq!(packet.get_ttl(), 57);
        assert_eq!(packet.get_icmp_type(), 0);
        assert_eq!(packet.get_type(), ResponseStatus::Received);
        assert_eq!(packet.get_id(), 0x1234);
        assert_eq!(packet.get_sequence(), 3);
        assert_eq!(packet.get_size(), 56);
    }

    #[test]
    fn parse_honours_ip_options() {
        let source = Ipv4Addr::new(192, 0, 2, 8);
        let packet = ReplyPacket::parse(&datagram(source, 12, 8, &echo(0, 7, 9, 32))).unwrap();

        // A fixed 20 byte offset would have read option bytes as the ICMP header
        assert_eq!(packet.get_type(), ResponseStatus::Received);
        assert_eq!(packet.get_id(), 7);
        assert_eq!(packet.get_sequence(), 9);
        assert_eq!(packet.get_size(), 32);
        assert_eq!(packet.get_ttl(), 12);
    }

    #[test]
    fn parse_time_exceeded_uses_quoted_header() {
        let router = Ipv4Addr::new(198, 51, 100, 1);
        let packet = ReplyPacket::parse(&datagram(router, 254, 0, &time_exceeded(0xbeef, 42))).unwrap();

        assert_eq!(packet.get_type(), ResponseStatus::Expired);
        assert_eq!(packet.get_icmp_type(), 11);
        assert_eq!(packet.get_source(), router);
        assert!(packet.answers(ProbeId { identifier: 0xbeef, sequence: 42 }));
        assert!(!packet.answers(ProbeId { identifier: 0xbeef, sequence: 41 }));
    }

    #[test]
    fn own_requests_are_not_answers() {
        let packet =
            ReplyPacket::parse(&datagram(Ipv4Addr::LOCALHOST, 64, 0, &echo(8, 5, 1, 0))).unwrap();

        assert_eq!(packet.get_type(), ResponseStatus::Request);
        assert!(!packet.answers(ProbeId { identifier: 5, sequence: 1 }));
    }

    #[test]
    fn reject_malformed() {
        assert_eq!(ReplyPacket::parse(&[]), None);
        assert_eq!(ReplyPacket::parse(&[0x45; 19]), None);

        // Truncated ICMP header
        let mut short = datagram(Ipv4Addr::LOCALHOST, 64, 0, &echo(0, 1, 1, 0));
        short.truncate(24);
        assert_eq!(ReplyPacket::parse(&short), None);

        // Not ICMP
        let mut udp = datagram(Ipv4Addr::LOCALHOST, 64, 0, &echo(0, 1, 1, 0));
        udp[9] = 17;
        assert_eq!(ReplyPacket::parse(&udp), None);

        // Time exceeded without a quoted header
        let bare = datagram(Ipv4Addr::LOCALHOST, 64, 0, &[11, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ReplyPacket::parse(&bare), None);
    }
}
