#![forbid(unsafe_code)]

//! Process-wide log sink.
//!
//! Backends write one line per operation through [`write`]. The sink is a
//! global guarded by a mutex; it must be installed with [`init`] (or
//! [`init_with_sink`]) and removed with [`shutdown`]. Both are strict:
//! initializing twice or shutting down twice is an [`Error::State`].
//!
//! The default sink is [`TracingSink`], which forwards every line as a
//! `tracing` event so embedders route LibM3C output through whatever
//! subscriber they already run. With the `tracing-fmt` feature, [`init`]
//! also installs a `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! A failing sink makes the calling operation fail with the sink's error.

use core::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for log lines.
pub trait LogSink: Send {
    fn write(&mut self, level: LogLevel, tag: &str, message: &str) -> Result<()>;
}

/// Forwards lines to `tracing` events with a `tag` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&mut self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        match level {
            LogLevel::Trace => tracing::trace!(tag, "{message}"),
            LogLevel::Debug => tracing::debug!(tag, "{message}"),
            LogLevel::Info => tracing::info!(tag, "{message}"),
            LogLevel::Warn => tracing::warn!(tag, "{message}"),
            LogLevel::Error => tracing::error!(tag, "{message}"),
            LogLevel::Fatal => tracing::error!(tag, fatal = true, "{message}"),
        }
        Ok(())
    }
}

/// Renders `[LEVEL] tag: message` lines into any writer.
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: W,
}

impl<W: Write + Send> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> LogSink for StreamSink<W> {
    fn write(&mut self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        writeln!(self.writer, "[{level}] {tag}: {message}").map_err(|_| Error::Io)?;
        self.writer.flush().map_err(|_| Error::Io)
    }
}

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

/// In-memory sink; clones share the same record list.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CaptureSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Messages only, in write order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl LogSink for CaptureSink {
    fn write(&mut self, level: LogLevel, tag: &str, message: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LogRecord {
                level,
                tag: tag.to_owned(),
                message: message.to_owned(),
            });
        Ok(())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use failing::FailingSink;

#[cfg(any(test, feature = "test-helpers"))]
mod failing {
    use super::{LogLevel, LogSink};
    use crate::error::{Error, Result};

    /// Accepts `successes` writes, then fails every write with `error`.
    #[derive(Debug, Clone)]
    pub struct FailingSink {
        successes: usize,
        error: Error,
    }

    impl FailingSink {
        #[must_use]
        pub fn new(successes: usize, error: Error) -> Self {
            Self { successes, error }
        }
    }

    impl LogSink for FailingSink {
        fn write(&mut self, _level: LogLevel, _tag: &str, _message: &str) -> Result<()> {
            if self.successes == 0 {
                return Err(self.error);
            }
            self.successes -= 1;
            Ok(())
        }
    }
}

// ============================================================================
// Global logger
// ============================================================================

static LOGGER: Mutex<Option<Box<dyn LogSink>>> = Mutex::new(None);

fn with_logger<T>(f: impl FnOnce(&mut Option<Box<dyn LogSink>>) -> T) -> T {
    let mut guard = LOGGER.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

/// Install the default [`TracingSink`].
pub fn init() -> Result<()> {
    init_with_sink(Box::new(TracingSink))?;
    #[cfg(feature = "tracing-fmt")]
    install_fmt_subscriber();
    Ok(())
}

#[cfg(feature = "tracing-fmt")]
fn install_fmt_subscriber() {
    use tracing_subscriber::EnvFilter;

    // A subscriber installed by the embedder wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Install `sink` as the process logger.
pub fn init_with_sink(sink: Box<dyn LogSink>) -> Result<()> {
    with_logger(|logger| {
        if logger.is_some() {
            return Err(Error::State);
        }
        *logger = Some(sink);
        Ok(())
    })
}

/// Remove the process logger.
pub fn shutdown() -> Result<()> {
    with_logger(|logger| logger.take().map(drop).ok_or(Error::State))
}

#[must_use]
pub fn is_initialized() -> bool {
    with_logger(|logger| logger.is_some())
}

/// Replace the sink of an initialized logger, returning the previous one.
pub fn set_sink(sink: Box<dyn LogSink>) -> Result<Box<dyn LogSink>> {
    with_logger(|logger| match logger {
        Some(current) => Ok(core::mem::replace(current, sink)),
        None => Err(Error::State),
    })
}

/// Write one line. Fails [`Error::State`] before [`init`].
pub fn write(level: LogLevel, tag: &str, message: &str) -> Result<()> {
    with_logger(|logger| match logger {
        Some(sink) => sink.write(level, tag, message),
        None => Err(Error::State),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tracing_test::traced_test;

    fn reset() {
        let _ = shutdown();
    }

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::Trace.as_str(), "TRACE");
        assert_eq!(LogLevel::Fatal.to_string(), "FATAL");
        assert!(LogLevel::Debug < LogLevel::Info);
    }

    #[test]
    fn stream_sink_formats_lines() {
        let mut sink = StreamSink::new(Vec::new());
        sink.write(LogLevel::Info, "m3.null", "ws.create_window")
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "[INFO] m3.null: ws.create_window\n");
    }

    #[test]
    fn stream_sink_maps_write_errors_to_io() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut sink = StreamSink::new(Broken);
        assert_eq!(sink.write(LogLevel::Warn, "t", "m"), Err(Error::Io));
    }

    #[test]
    fn failing_sink_counts_down() {
        let mut sink = FailingSink::new(1, Error::Permission);
        assert_eq!(sink.write(LogLevel::Info, "t", "a"), Ok(()));
        assert_eq!(sink.write(LogLevel::Info, "t", "b"), Err(Error::Permission));
    }

    #[test]
    #[traced_test]
    fn tracing_sink_emits_events() {
        TracingSink
            .write(LogLevel::Info, "m3.null", "gfx.begin_frame")
            .unwrap();
        assert!(logs_contain("gfx.begin_frame"));
        assert!(logs_contain("m3.null"));
    }

    #[test]
    #[serial]
    fn write_requires_init() {
        reset();
        assert_eq!(write(LogLevel::Info, "t", "m"), Err(Error::State));
        assert!(!is_initialized());
    }

    #[test]
    #[serial]
    fn init_and_shutdown_are_strict() {
        reset();
        init().unwrap();
        assert!(is_initialized());
        assert_eq!(init(), Err(Error::State));
        shutdown().unwrap();
        assert_eq!(shutdown(), Err(Error::State));
    }

    #[test]
    #[serial]
    fn set_sink_swaps_and_returns_previous() {
        reset();
        assert!(set_sink(Box::new(CaptureSink::new())).is_err());
        let first = CaptureSink::new();
        let second = CaptureSink::new();
        init_with_sink(Box::new(first.clone())).unwrap();
        write(LogLevel::Debug, "a", "one").unwrap();
        let _previous = set_sink(Box::new(second.clone())).unwrap();
        write(LogLevel::Error, "b", "two").unwrap();
        shutdown().unwrap();

        assert_eq!(first.messages(), vec!["one".to_owned()]);
        assert_eq!(
            second.records(),
            vec![LogRecord {
                level: LogLevel::Error,
                tag: "b".to_owned(),
                message: "two".to_owned(),
            }]
        );
    }

    #[test]
    #[serial]
    fn sink_errors_propagate() {
        reset();
        init_with_sink(Box::new(FailingSink::new(0, Error::Io))).unwrap();
        assert_eq!(write(LogLevel::Info, "t", "m"), Err(Error::Io));
        shutdown().unwrap();
    }
}
