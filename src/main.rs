#[macro_use]
extern crate log;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rawping::cli::{App, Command};
use rawping::config::{PingConfig, TraceConfig};
use rawping::packet::EchoRequestBuilder;
use rawping::ping::PingSession;
use rawping::trace::TracerouteSession;
use rawping::transport::RawTransport;
use rawping::{report, resolve, Error, InterruptSignal, Result};

fn main() {
    let command = match App::parse_args() {
        Ok(command) => command,
        // Clap prints usage and help itself and picks the exit status
        Err(Error::Usage(e)) => e.exit(),
        Err(e) => {
            error!("Could not parse provided argument: {}", e);
            std::process::exit(1);
        }
    };

    let result = match command {
        Command::Ping(config) => run_ping(&config),
        Command::Traceroute(config) => run_trace(&config),
    };

    if let Err(e) = result {
        error!("{}", e);
        if e.is_permission_denied() {
            error!("Raw sockets require root privileges or the CAP_NET_RAW capability");
        }
        std::process::exit(1);
    }

    trace!("Shutting down...");
}

/// Install the Ctrl-C handler
fn interrupt_signal() -> Result<InterruptSignal> {
    let signal = Arc::new(AtomicBool::new(false));
    let handle = signal.clone();
    ctrlc::set_handler(move || handle.store(true, Ordering::SeqCst))?;
    Ok(signal)
}

fn run_ping(config: &PingConfig) -> Result<()> {
    let addr = resolve::resolve(&config.dest)?;
    let mut transport = RawTransport::open()?;
    let interrupt = interrupt_signal()?;

    println!("{}", report::ping_banner(&config.dest, addr, config.size));

    trace!("Start ping session");

    let outcome = PingSession::new(config, addr, EchoRequestBuilder::from_entropy())
        .with_interrupt(interrupt)
        .run(&mut transport, |_, result| println!("{}", report::probe_line(result)))?;

    trace!("Successfully ended ping session");

    let stats = outcome.statistics().ok_or(Error::NoProbesSent)?;
    println!();
    println!("{}", report::ping_statistics(addr, &stats));
    Ok(())
}

fn run_trace(config: &TraceConfig) -> Result<()> {
    let addr = resolve::resolve(&config.dest)?;
    let mut transport = RawTransport::open()?;
    let interrupt = interrupt_signal()?;

    println!("{}", report::trace_banner(&config.dest, addr, config.max_hops));

    trace!("Start traceroute session");

    let outcome = TracerouteSession::new(config, addr, EchoRequestBuilder::from_entropy())
        .with_interrupt(interrupt)
        .run(&mut transport, |hop| {
            let name = match hop.responder {
                Some(responder) if config.resolve_names => resolve::reverse(responder),
                _ => None,
            };
            println!(
                "{}",
                report::hop_line(hop, config.show_unanswered, name.as_deref())
            );
        })?;

    trace!("Successfully ended traceroute session");

    println!(
        "{}",
        report::trace_footer(&config.dest, outcome.verdict, config.max_hops)
    );
    Ok(())
}
