//! # RAWPING ping and traceroute application
//!
//! This crate provides the components of a UNIX ping and traceroute application built on raw
//! ICMP sockets. Every echo request is assembled and checksummed by hand. It consists of these
//! major components:
//! - The `checksum` and `packet` modules, which build echo requests and parse incoming datagrams
//! - The `Transport` seam, implemented by `RawTransport` over a raw IPv4 socket
//! - The `PingSession` and `TracerouteSession`, which drive probes over any `Transport`
//!
//! Both sessions are single threaded. Each probe is sent and then waited for with a bounded
//! timeout, and the round-trip time is measured from the moment the packet left the socket to the
//! moment its reply was handed back.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod packet;
pub mod ping;
pub mod report;
pub mod resolve;
pub mod trace;
pub mod transport;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};

/// Raised once the user asked the running session to stop
///
/// Sessions check the flag between probes, so a session finishes the probe in flight before it
/// returns.
pub type InterruptSignal = Arc<AtomicBool>;
