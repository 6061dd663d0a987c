//! Logging setup, in the style of `flux::logging` (which wires
//! `sloggers`' `LoggerConfig` off a TOML snippet) but finished: the
//! terminal level is driven by `--debug` instead of being hard-coded.

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

pub use slog::{debug, error, info, o, trace, warn, Logger};

/// Builds the root logger for the process. `debug` raises the minimum
/// level from `Info` to `Debug`; output always goes to stderr so stdout
/// stays free for any piped tooling.
pub fn init(debug: bool) -> Logger {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(if debug { Severity::Debug } else { Severity::Info });
    builder.destination(Destination::Stderr);
    builder
        .build()
        .expect("terminal logger configuration is always valid")
}

/// A logger that discards everything, used in unit tests that don't
/// want to wire up a real sink.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}
