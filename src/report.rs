//! Human readable output
//!
//! The sessions only produce structured results. This module turns them into the lines printed
//! on standard output.

use std::net::Ipv4Addr;

use crate::config::Dest;
use crate::packet::ResponseStatus;
use crate::ping::{ProbeResult, Statistics};
use crate::trace::{Hop, Verdict};

pub fn ping_banner(dest: &Dest, addr: Ipv4Addr, size: usize) -> String {
    format!("Pinging {} [{}] with {} bytes of data:", dest, addr, size)
}

/// One line per probe
pub fn probe_line(result: &ProbeResult) -> String {
    match result {
        ProbeResult::Reply(reply) => match reply.status {
            ResponseStatus::Received => format!(
                "Reply from {}: bytes={} time={}ms TTL={}",
                reply.source,
                reply.size,
                reply.rtt.as_millis(),
                reply.ttl
            ),
            ResponseStatus::Expired => format!("Reply from {}: TTL expired in transit.", reply.source),
            ResponseStatus::Unreachable => {
                format!("Reply from {}: Destination host unreachable.", reply.source)
            }
            _ => format!("Reply from {}: ICMP type {}.", reply.source, reply.icmp_type),
        },
        ProbeResult::Timeout => "Request timed out.".to_string(),
        ProbeResult::SendFailed => "General failure.".to_string(),
    }
}

/// Summary block printed at the end of a ping session
pub fn ping_statistics(addr: Ipv4Addr, stats: &Statistics) -> String {
    let mut out = format!(
        "Ping statistics for {}:\n\tPackets: Sent = {}, Received = {}, Lost = {} ({:.0}% loss),",
        addr, stats.sent, stats.received, stats.lost, stats.loss
    );

    if let Some(rtt) = &stats.rtt {
        out.push_str(&format!(
            "\nApproximate round trip times in milli-seconds:\n\tMinimum = {}ms, Maximum = {}ms, Average = {}ms",
            rtt.min.as_millis(),
            rtt.max.as_millis(),
            rtt.avg.as_millis()
        ));
    }
    out
}

pub fn trace_banner(dest: &Dest, addr: Ipv4Addr, max_hops: u8) -> String {
    format!(
        "Tracing route to {} [{}]\nover a maximum of {} hops:\n",
        dest, addr, max_hops
    )
}

/// One line per hop
///
/// Lists the round-trip time of every probe, or `*` for probes without reply, followed by the
/// responding host. `name` is the host name of the responder, if it was looked up.
pub fn hop_line(hop: &Hop, show_unanswered: bool, name: Option<&str>) -> String {
    let mut line = format!("{:>2}", hop.ttl);

    for probe in &hop.probes {
        match probe.reply() {
            Some(reply) => line.push_str(&format!("  {:>4} ms", reply.rtt.as_millis())),
            None => line.push_str(&format!("  {:>4}   ", "*")),
        }
    }

    if show_unanswered {
        line.push_str(&format!(
            "  {}/{} packets not answered",
            hop.unanswered(),
            hop.probes.len()
        ));
    }

    match (hop.responder, name) {
        (Some(addr), Some(name)) => line.push_str(&format!("  {} [{}]", name, addr)),
        (Some(addr), None) => line.push_str(&format!("  {}", addr)),
        (None, _) => line.push_str("  Request timed out."),
    }
    line
}

pub fn trace_footer(dest: &Dest, verdict: Verdict, max_hops: u8) -> String {
    match verdict {
        Verdict::Reached => "\nTrace complete.".to_string(),
        Verdict::Exhausted => format!("\nUnable to reach {} in {} hops.", dest, max_hops),
        Verdict::Interrupted => "\nTrace interrupted.".to_string(),
    }
}
