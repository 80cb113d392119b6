use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::packet::{ProbeId, ResponseStatus};
use crate::transport::{Received, Reply, Transport};

/// A probe as the fake transport saw it go out
#[derive(Debug, Clone, PartialEq)]
pub struct SentProbe {
    /// TTL set on the transport at the time of sending, `None` for the system default
    pub ttl: Option<u8>,
    pub probe: ProbeId,
    pub dest: Ipv4Addr,
    pub len: usize,
}

type Responder = Box<dyn FnMut(Option<u8>, u16) -> Received>;

/// Scripted transport for driving sessions without a network
///
/// Each receive asks the responder for the outcome, given the current TTL and the sequence number
/// of the probe waited for.
pub struct FakeTransport {
    ttl: Option<u8>,
    responder: Responder,
    send_failures: HashMap<u16, io::ErrorKind>,
    pub sent: Vec<SentProbe>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(Option<u8>, u16) -> Received + 'static,
    {
        Self {
            ttl: None,
            responder: Box::new(responder),
            send_failures: HashMap::new(),
            sent: Vec::new(),
        }
    }

    /// Make the send of the probe with sequence number `sequence` fail
    pub fn fail_send(&mut self, sequence: u16, kind: io::ErrorKind) {
        self.send_failures.insert(sequence, kind);
    }
}

impl Transport for FakeTransport {
    fn set_ttl(&mut self, ttl: u8) -> Result<()> {
        self.ttl = Some(ttl);
        Ok(())
    }

    fn send(&mut self, packet: &[u8], dest: Ipv4Addr) -> Result<()> {
        let probe = ProbeId {
            identifier: u16::from_be_bytes([packet[4], packet[5]]),
            sequence: u16::from_be_bytes([packet[6], packet[7]]),
        };
        if let Some(kind) = self.send_failures.get(&probe.sequence) {
            return Err(Error::Transmit(io::Error::from(*kind)));
        }
        self.sent.push(SentProbe {
            ttl: self.ttl,
            probe,
            dest,
            len: packet.len(),
        });
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration, probe: ProbeId) -> Result<Received> {
        let last = self.sent.last().map(|s| s.probe);
        assert_eq!(last, Some(probe), "waiting for a probe that was not sent last");
        Ok((self.responder)(self.ttl, probe.sequence))
    }
}

pub fn echo_reply(source: Ipv4Addr, ttl: u8, size: usize, rtt: Duration) -> Reply {
    Reply {
        source,
        ttl,
        icmp_type: 0,
        status: ResponseStatus::Received,
        size,
        rtt,
    }
}

pub fn expired(source: Ipv4Addr, rtt: Duration) -> Reply {
    Reply {
        source,
        ttl: 254,
        icmp_type: 11,
        status: ResponseStatus::Expired,
        size: 36,
        rtt,
    }
}
