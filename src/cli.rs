//! Command line interface

use clap::{ArgMatches, ErrorKind};
use std::ffi::OsString;
use std::time::Duration;

use crate::config::{Dest, PingConfig, TraceConfig, MAX_PAYLOAD_SIZE};
use crate::error::Result;
use crate::logger::StdLogger;

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping(PingConfig),
    Traceroute(TraceConfig),
}

/// Application initialization
pub struct App;

impl App {
    /// Retrieve user input from the process arguments
    pub fn parse_args() -> Result<Command> {
        Self::parse_from(std::env::args_os())
    }

    /// Retrieve user input from command line
    ///
    /// Two subcommands are available. `ping` takes the following parameters:
    /// - destination: Either as IPv4 address or host name (required)
    /// - count: Number of echo requests to send (default unbounded)
    /// - interval: Seconds to wait between requests, unless one timed out (default 1)
    /// - size: The payload size per packet (default 56 bytes, at most 65507)
    /// - timeout: Seconds after which the session ends (default unbounded)
    ///
    /// `traceroute` takes:
    /// - destination: Either as IPv4 address or host name (required)
    /// - numeric: Do not look up host names of the hops
    /// - queries: Number of probes per hop (default 3)
    /// - summary: Print the number of unanswered probes per hop
    ///
    /// All integer values are validated here, before any packet is sent.
    ///
    /// Note that the transmission size is limited by the network and your network device. Network
    /// devices are only required to support a Minimum Transmission Unit and exceeding the limit
    /// risks fragmentation of network packets. The MTU includes the payload the ICMP headers and
    /// the IP headers.
    pub fn parse_from<I, T>(args: I) -> Result<Command>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        // Define CLI interface here
        let app = clap_app!(rawping =>
            (version: crate_version!())
            (author: "Michael Prantl <michael.prantl@hotmail.de>")
            (about: "Ping and trace the route to a host with raw ICMP packets")
            (@setting SubcommandRequiredElseHelp)
            (@setting VersionlessSubcommands)
            (@arg verbose: -v --verbose +multiple +global "Sets the level of verbosity")
            (@subcommand ping =>
                (about: "Send echo requests to a host")
                (@arg destination: +required "Host name or destination address")
                (@arg count: -c +takes_value "Stops after sending this many requests")
                (@arg interval: -i +takes_value "Waits this many seconds between requests")
                (@arg size: -s +takes_value "Sets payload size (in Bytes)")
                (@arg timeout: -t +takes_value "Stops after this many seconds"))
            (@subcommand traceroute =>
                (about: "Print the route packets take to a host")
                (@arg destination: +required "Host name or destination address")
                (@arg numeric: -n "Prints hop addresses without looking up host names")
                (@arg queries: -q +takes_value "Sets the number of probes per hop")
                (@arg summary: -S "Prints the number of unanswered probes per hop")));

        let matches = app.get_matches_from_safe(args)?;

        let (command, verbosity) = match matches.subcommand() {
            ("ping", Some(sub)) => (Command::Ping(ping_config(sub)?), sub.occurrences_of("verbose")),
            ("traceroute", Some(sub)) => (
                Command::Traceroute(trace_config(sub)?),
                sub.occurrences_of("verbose"),
            ),
            // Clap refuses to parse without a subcommand
            _ => unreachable!("subcommand is required"),
        };

        StdLogger::init(verbosity.max(matches.occurrences_of("verbose")));
        trace!("Parsed configuration: {:?}", command);

        Ok(command)
    }
}

fn ping_config(matches: &ArgMatches) -> Result<PingConfig> {
    let mut config = PingConfig::new(destination(matches));

    if matches.is_present("count") {
        config.count = Some(value_t!(matches, "count", u64)?);
    }
    if matches.is_present("interval") {
        config.interval = Duration::from_secs(value_t!(matches, "interval", u64)?);
    }
    if matches.is_present("size") {
        config.size = value_t!(matches, "size", usize)?;
        if config.size > MAX_PAYLOAD_SIZE {
            let msg = format!(
                "Payload size {} exceeds the maximum of {} bytes",
                config.size, MAX_PAYLOAD_SIZE
            );
            return Err(clap::Error::with_description(&msg, ErrorKind::InvalidValue).into());
        }
        if config.size > 1472 {
            warn!("Beware of the Maximum Transmission Unit supported by your network device");
            warn!("If you do not receive any responses, try a smaller packet size");
        }
    }
    if matches.is_present("timeout") {
        config.deadline = Some(Duration::from_secs(value_t!(matches, "timeout", u64)?));
    }

    Ok(config)
}

fn trace_config(matches: &ArgMatches) -> Result<TraceConfig> {
    let mut config = TraceConfig::new(destination(matches));

    config.resolve_names = !matches.is_present("numeric");
    config.show_unanswered = matches.is_present("summary");
    if matches.is_present("queries") {
        config.probes_per_hop = value_t!(matches, "queries", u16)?;
    }

    Ok(config)
}

fn destination(matches: &ArgMatches) -> Dest {
    // Clap states calling `unwrap` on a required value is always safe
    Dest::parse(matches.value_of("destination").unwrap())
}
