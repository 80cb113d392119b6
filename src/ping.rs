use rand::RngCore;
use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{PingConfig, PROBE_TIMEOUT};
use crate::error::Result;
use crate::packet::{EchoRequestBuilder, ProbeId};
use crate::transport::{Received, Reply, Transport};
use crate::InterruptSignal;

/// Outcome of a single probe
///
/// Results are recorded in the order the probes were sent and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    /// A reply matching the probe arrived in time
    Reply(Reply),
    /// No reply arrived within the probe timeout
    Timeout,
    /// The probe could not be handed to the network
    SendFailed,
}

impl ProbeResult {
    /// Get the echo reply, if the probed host answered
    ///
    /// Other replies, like a router reporting that the probe expired in transit, do not count.
    pub fn echo_reply(&self) -> Option<&Reply> {
        match self {
            Self::Reply(reply) if reply.is_echo_reply() => Some(reply),
            _ => None,
        }
    }

    /// Get any reply, including ICMP error messages about the probe
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Reply(reply) => Some(reply),
            _ => None,
        }
    }
}

/// Summary of round-trip times
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RttSummary {
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
}

/// Summary statistics of a ping session
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub sent: usize,
    pub received: usize,
    pub lost: usize,
    /// Lost probes in percent of sent probes
    pub loss: f64,
    /// Round-trip times of the echo replies, `None` if there were none
    pub rtt: Option<RttSummary>,
}

impl Statistics {
    /// Summarize a sequence of probe results
    ///
    /// Returns `None` if no probe was sent at all, which is a different thing from all probes
    /// being lost. Only echo replies count as received, and only their round-trip times enter the
    /// summary.
    pub fn from_results(results: &[ProbeResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }

        let rtts: Vec<Duration> = results
            .iter()
            .filter_map(ProbeResult::echo_reply)
            .map(|reply| reply.rtt)
            .collect();

        let sent = results.len();
        let received = rtts.len();
        let lost = sent - received;

        // Percentage of lost packets over all packets sent
        let loss = lost as f64 / sent as f64 * 100f64;

        let rtt = match (rtts.iter().min(), rtts.iter().max()) {
            (Some(&min), Some(&max)) => {
                let total: Duration = rtts.iter().sum();
                Some(RttSummary {
                    min,
                    max,
                    avg: total / received as u32,
                })
            }
            _ => None,
        };

        Some(Self {
            sent,
            received,
            lost,
            loss,
            rtt,
        })
    }
}

/// Everything a ping session recorded
#[derive(Debug, Clone, PartialEq)]
pub struct PingOutcome {
    pub results: Vec<ProbeResult>,
    /// Set if the session ended because of an interrupt
    pub interrupted: bool,
}

impl PingOutcome {
    /// Summary statistics, `None` if no probe was sent
    pub fn statistics(&self) -> Option<Statistics> {
        Statistics::from_results(&self.results)
    }
}

/// A ping session against a single destination
///
/// The session repeats a probe cycle: build an echo request with the next sequence number, send
/// it, wait for the reply or the probe timeout, and record the result. It ends when the configured
/// number of probes has been sent, the overall deadline has passed, or the interrupt signal is
/// raised. Probe timeouts are recorded and the session simply continues.
///
/// The session pauses for the configured interval after every probe that did not run into the
/// probe timeout, including failed sends. If the pause would carry the session past its deadline,
/// the session ends instead.
pub struct PingSession<'a, R> {
    config: &'a PingConfig,
    dest: Ipv4Addr,
    builder: EchoRequestBuilder<R>,
    interrupt: InterruptSignal,
}

impl<'a, R: RngCore> PingSession<'a, R> {
    pub fn new(config: &'a PingConfig, dest: Ipv4Addr, builder: EchoRequestBuilder<R>) -> Self {
        Self {
            config,
            dest,
            builder,
            interrupt: InterruptSignal::default(),
        }
    }

    /// Stop the session as soon as `interrupt` is raised
    ///
    /// The signal is only checked between probes, a probe in flight is always resolved first.
    pub fn with_interrupt(mut self, interrupt: InterruptSignal) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Run the session to completion
    ///
    /// `on_probe` is called with the sequence number and the result of each probe as soon as it
    /// is recorded.
    ///
    /// # Errors
    ///
    /// Fails if the transport reports an error the session cannot continue after, e.g. a socket
    /// that may not be used for sending. All other send failures are recorded as lost probes.
    pub fn run<T, F>(&mut self, transport: &mut T, mut on_probe: F) -> Result<PingOutcome>
    where
        T: Transport,
        F: FnMut(u16, &ProbeResult),
    {
        let started = Instant::now();
        let mut results = Vec::new();
        let mut sequence = 0u16;
        let mut interrupted = false;

        loop {
            if self.interrupt.load(Ordering::SeqCst) {
                debug!("Interrupted after {} probes", results.len());
                interrupted = true;
                break;
            }
            if self.count_reached(results.len()) {
                break;
            }
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() >= deadline {
                    debug!("Deadline of {:?} reached", deadline);
                    break;
                }
            }

            sequence = sequence.wrapping_add(1);
            let result = probe(
                transport,
                &mut self.builder,
                self.dest,
                sequence,
                self.config.size,
                PROBE_TIMEOUT,
            )?;
            on_probe(sequence, &result);

            // A timeout has already waited long enough
            let waited = result == ProbeResult::Timeout;
            results.push(result);

            if !waited && !self.count_reached(results.len()) && !self.pause(started) {
                break;
            }
        }

        Ok(PingOutcome {
            results,
            interrupted,
        })
    }

    fn count_reached(&self, sent: usize) -> bool {
        match self.config.count {
            Some(count) => sent as u64 >= count,
            None => false,
        }
    }

    /// Sleep for the configured interval
    ///
    /// Returns `false` without sleeping if the interval would end past the deadline.
    fn pause(&self, started: Instant) -> bool {
        if let Some(deadline) = self.config.deadline {
            if started.elapsed() + self.config.interval > deadline {
                debug!("Next probe would be sent past the deadline of {:?}", deadline);
                return false;
            }
        }
        thread::sleep(self.config.interval);
        true
    }
}

/// Send one echo request and wait for its reply
///
/// A send failure the session can continue after is recorded as `SendFailed`, without waiting
/// for a reply.
pub(crate) fn probe<T, R>(
    transport: &mut T,
    builder: &mut EchoRequestBuilder<R>,
    dest: Ipv4Addr,
    sequence: u16,
    size: usize,
    timeout: Duration,
) -> Result<ProbeResult>
where
    T: Transport,
    R: RngCore,
{
    let packet = builder.build(sequence, size);
    let id = ProbeId {
        identifier: builder.identifier(),
        sequence,
    };

    match transport.send(&packet, dest) {
        Ok(()) => (),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("Echo request {} was not sent: {}", sequence, e);
            return Ok(ProbeResult::SendFailed);
        }
    }

    Ok(match transport.receive(timeout, id)? {
        Received::Reply(reply) => ProbeResult::Reply(reply),
        Received::TimedOut => ProbeResult::Timeout,
    })
}
