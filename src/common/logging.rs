//! Logging and tracing configuration
//!
//! stdout carries the DAP wire, so diagnostics must never touch it.
//! Logs go to stderr and, when a log directory is available, to a file
//! alongside it.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use super::paths;

/// Verbosity selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn default_filter(self) -> &'static str {
        match self {
            Self::Quiet => "lua_dap=error,warn",
            Self::Normal => "lua_dap=info,warn",
            Self::Verbose => "lua_dap=trace,info",
        }
    }
}

/// Initialize tracing for the adapter process
///
/// Returns the log file path and the appender guard; the guard must be
/// kept alive for the lifetime of the process or buffered log lines are
/// lost on exit. `RUST_LOG` overrides the verbosity-derived filter.
pub fn init(verbosity: Verbosity) -> (Option<PathBuf>, Option<WorkerGuard>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));

    let log_dir = paths::log_dir()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    if let Some(dir) = log_dir {
        let appender = tracing_appender::rolling::never(&dir, "adapter.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();

        return (Some(dir.join("adapter.log")), Some(guard));
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();

    (None, None)
}
