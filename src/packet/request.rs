use pnet::packet::icmp::{echo_request::MutableEchoRequestPacket, IcmpCode, IcmpTypes};
use pnet::packet::Packet;
use rand::rngs::ThreadRng;
use rand::{Rng, RngCore};

use super::ICMP_HEADER_LEN;
use crate::checksum::checksum;

/// Builds echo request packets for one session
///
/// Low-level abstraction for outgoing echo request messages. The identifier is drawn once from the
/// random source when the builder is created and stays the same for every packet it builds, so
/// replies can be attributed to the session. The payload is drawn fresh for every packet.
///
/// The random source is a type parameter, so tests can hand in a deterministic generator.
#[derive(Debug)]
pub struct EchoRequestBuilder<R> {
    rng: R,
    identifier: u16,
}

impl EchoRequestBuilder<ThreadRng> {
    /// Create a builder backed by the thread-local generator
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: RngCore> EchoRequestBuilder<R> {
    pub fn new(mut rng: R) -> Self {
        let identifier = rng.gen::<u16>();
        Self { rng, identifier }
    }

    /// Identifier written into every packet of this builder
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Build a complete echo request
    ///
    /// The header is packed with a zeroed checksum field first and the checksum is computed over
    /// header and payload. The result is then written into the checksum field, so the returned
    /// packet checksums to zero.
    ///
    /// The packet is `ICMP_HEADER_LEN + payload_size` bytes long.
    pub fn build(&mut self, sequence: u16, payload_size: usize) -> Vec<u8> {
        let mut payload = vec![0u8; payload_size];
        self.rng.fill_bytes(&mut payload);

        let mut buf = vec![0u8; ICMP_HEADER_LEN + payload_size];
        {
            // The buffer is sized for header plus payload, so the view always fits
            let mut pkg = MutableEchoRequestPacket::new(&mut buf[..])
                .expect("buffer holds at least an echo request header");
            pkg.set_icmp_type(IcmpTypes::EchoRequest);
            pkg.set_icmp_code(IcmpCode::new(0));
            pkg.set_checksum(0);
            pkg.set_identifier(self.identifier);
            pkg.set_sequence_number(sequence);
            pkg.set_payload(&payload);

            let sum = checksum(pkg.packet());
            pkg.set_checksum(sum);
        }

        trace!(
            "Built echo request id={} seq={} ({} bytes)",
            self.identifier,
            sequence,
            buf.len()
        );
        buf
    }
}
