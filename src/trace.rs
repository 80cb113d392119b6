use rand::RngCore;
use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;

use crate::config::{TraceConfig, PROBE_TIMEOUT, TRACE_PAYLOAD_SIZE};
use crate::error::Result;
use crate::packet::EchoRequestBuilder;
use crate::ping::{probe, ProbeResult};
use crate::transport::Transport;
use crate::InterruptSignal;

/// All probes sent with one TTL
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub ttl: u8,
    /// Results in the order the probes were sent
    pub probes: Vec<ProbeResult>,
    /// Sender of the first reply, `None` if no probe was answered
    pub responder: Option<Ipv4Addr>,
    /// Set if the destination itself answered with an echo reply
    pub reached: bool,
}

impl Hop {
    fn new(ttl: u8) -> Self {
        Self {
            ttl,
            probes: Vec::new(),
            responder: None,
            reached: false,
        }
    }

    fn record(&mut self, result: ProbeResult) {
        if let Some(reply) = result.reply() {
            if self.responder.is_none() {
                self.responder = Some(reply.source);
            }
            // Routers on the way answer with time exceeded, only the destination echoes
            if reply.is_echo_reply() {
                self.reached = true;
            }
        }
        self.probes.push(result);
    }

    /// Number of probes that got any reply
    pub fn answered(&self) -> usize {
        self.probes.iter().filter(|p| p.reply().is_some()).count()
    }

    /// Number of probes without a reply
    pub fn unanswered(&self) -> usize {
        self.probes.len() - self.answered()
    }
}

/// How a traceroute ended
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The last hop is the destination
    Reached,
    /// The destination did not answer within the maximum number of hops
    Exhausted,
    /// The user stopped the trace
    Interrupted,
}

/// Everything a traceroute session recorded
#[derive(Debug, Clone, PartialEq)]
pub struct TraceOutcome {
    pub hops: Vec<Hop>,
    pub verdict: Verdict,
}

/// A traceroute session
///
/// Starting with a TTL of 1, the session sends a batch of echo requests per TTL and waits for each
/// reply in turn. Routers drop a probe whose TTL runs out and answer with time exceeded, which
/// reveals their address. The destination answers with an echo reply, which ends the trace.
///
/// Sequence numbers are unique across the whole session, so a late reply from an earlier hop is
/// never mistaken for the answer to the current probe.
pub struct TracerouteSession<'a, R> {
    config: &'a TraceConfig,
    dest: Ipv4Addr,
    builder: EchoRequestBuilder<R>,
    interrupt: InterruptSignal,
    sequence: u16,
}

impl<'a, R: RngCore> TracerouteSession<'a, R> {
    pub fn new(config: &'a TraceConfig, dest: Ipv4Addr, builder: EchoRequestBuilder<R>) -> Self {
        Self {
            config,
            dest,
            builder,
            interrupt: InterruptSignal::default(),
            sequence: 0,
        }
    }

    /// Stop the trace as soon as `interrupt` is raised
    ///
    /// The signal is checked between hops, a hop that has started is always probed completely.
    pub fn with_interrupt(mut self, interrupt: InterruptSignal) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Run the trace to completion
    ///
    /// `on_hop` is called with every hop as soon as all of its probes are resolved.
    ///
    /// # Errors
    ///
    /// Fails if the TTL cannot be set or the transport reports an error the session cannot
    /// continue after. Other send failures are recorded as unanswered probes.
    pub fn run<T, F>(&mut self, transport: &mut T, mut on_hop: F) -> Result<TraceOutcome>
    where
        T: Transport,
        F: FnMut(&Hop),
    {
        let mut hops = Vec::new();

        for ttl in 1..=self.config.max_hops {
            if self.interrupt.load(Ordering::SeqCst) {
                debug!("Interrupted before hop {}", ttl);
                return Ok(TraceOutcome {
                    hops,
                    verdict: Verdict::Interrupted,
                });
            }

            let hop = self.probe_hop(transport, ttl)?;
            on_hop(&hop);
            let reached = hop.reached;
            hops.push(hop);

            if reached {
                info!("Reached {} after {} hops", self.dest, ttl);
                return Ok(TraceOutcome {
                    hops,
                    verdict: Verdict::Reached,
                });
            }
        }

        info!("{} not reached within {} hops", self.dest, self.config.max_hops);
        Ok(TraceOutcome {
            hops,
            verdict: Verdict::Exhausted,
        })
    }

    fn probe_hop<T: Transport>(&mut self, transport: &mut T, ttl: u8) -> Result<Hop> {
        transport.set_ttl(ttl)?;

        let mut hop = Hop::new(ttl);
        for _ in 0..self.config.probes_per_hop {
            self.sequence = self.sequence.wrapping_add(1);
            let result = probe(
                transport,
                &mut self.builder,
                self.dest,
                self.sequence,
                TRACE_PAYLOAD_SIZE,
                PROBE_TIMEOUT,
            )?;
            hop.record(result);
        }

        trace!(
            "Hop {}: {}/{} answered",
            ttl,
            hop.answered(),
            hop.probes.len()
        );
        Ok(hop)
    }
}
