//! Minimal stderr logger.
//!
//! Prints `[elapsed LEVEL target] message`. Install once at startup with
//! [`init_with_level`] or [`init_from_env`]; later calls are no-ops.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV_VAR: &str = "SHAPE_TARGETS_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let target = record.target();
        let short_target = target.rsplit("::").next().unwrap_or(target);
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            short_target,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install the logger with the level named in `SHAPE_TARGETS_LOG`
/// (`error`, `warn`, `info`, `debug`, `trace`, `off`), or `fallback`.
pub fn init_from_env(fallback: LevelFilter) -> Result<(), log::SetLoggerError> {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|s| LevelFilter::from_str(s.trim()).ok())
        .unwrap_or(fallback);
    init_with_level(level)
}

/// Install a `tracing` subscriber with span-close timing, filtered by
/// `RUST_LOG` when set and by `default_level` otherwise.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(default_level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(feature = "tracing")]
fn level_directive(level: LevelFilter) -> String {
    level.as_str().to_ascii_lowercase()
}
