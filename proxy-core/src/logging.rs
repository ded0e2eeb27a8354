//! The log sink contract (§6): the core never writes to a file descriptor or
//! syslog itself, it only ever calls `log(level, message)`. That contract is
//! realized here as a thin layer over `tracing`, so the daemon shell
//! (`proxyd`) can route records to stderr, a file, or syslog (behind the
//! `syslog` feature) by configuring a `tracing_subscriber` as it sees fit.

/// Severity levels named by the log sink contract (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Crit,
    Err,
    Warning,
    Notice,
    Conn,
    Info,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Crit => "crit",
            Level::Err => "err",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Conn => "conn",
            Level::Info => "info",
        }
    }
}

/// Emits a record at the given level. `Notice` and `Conn` both map onto
/// `tracing::info!`, tagged with a `kind` field so a subscriber can still
/// filter or route them distinctly (e.g. a `connect` log to its own file).
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {{
        match $level {
            $crate::logging::Level::Crit | $crate::logging::Level::Err => {
                tracing::error!($($arg)+)
            }
            $crate::logging::Level::Warning => tracing::warn!($($arg)+),
            $crate::logging::Level::Notice => {
                tracing::info!(kind = "notice", $($arg)+)
            }
            $crate::logging::Level::Conn => {
                tracing::info!(kind = "conn", $($arg)+)
            }
            $crate::logging::Level::Info => tracing::info!($($arg)+),
        }
    }};
}
