use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{stderr, Write};
use std::sync::Once;

/// Log implementation for the standard error stream
///
/// Probe results are printed on standard output. Diagnostics go to standard error, so they never
/// interleave with the result lines when the output is piped.
pub struct StdLogger;

impl StdLogger {
    /// Initialize logger
    ///
    /// The verbosity is the number of times `-v` was given on the command line. Without it only
    /// warnings and errors are shown.
    ///
    /// Even if this function is called multiple times, initialization will only be done once.
    pub fn init(verbosity: u64) {
        static INIT: Once = Once::new();

        INIT.call_once(|| {
            if log::set_logger(&StdLogger).is_ok() {
                log::set_max_level(level_for(verbosity));
            }
        });
    }
}

/// Map the number of `-v` flags to the most detailed level shown
fn level_for(verbosity: u64) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl Log for StdLogger {
    /// Filtering is left to the global max level
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let prefix = match record.level() {
            Level::Error => "[-]",
            Level::Warn => "[!]",
            Level::Info => "[i]",
            _ => "[+]",
        };

        // Locking the handle keeps concurrent records from interleaving
        let stderr = stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(handle, "{} {}", prefix, record.args());
    }

    fn flush(&self) {
        let _ = stderr().flush();
    }
}
