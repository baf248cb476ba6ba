//! Command-line surface and process exit codes

use std::path::PathBuf;

use clap::Parser;

use crate::common::logging::Verbosity;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 101;
/// Reserved: could not connect to the target runtime
pub const EXIT_TARGET_UNREACHABLE: i32 = 102;
/// Reserved: could not connect to the IDE
pub const EXIT_CLIENT_UNREACHABLE: i32 = 103;

/// Debug adapter bridging DAP clients to a remote Lua script runtime
#[derive(Parser, Debug)]
#[command(name = "lua-dap", version, disable_help_flag = true)]
pub struct Cli {
    /// Block at startup until a debugger attaches to this process
    #[arg(long)]
    pub wait_for_debugger: bool,

    /// Verbose diagnostics (stderr and adapter log)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long)]
    pub quiet: bool,

    /// Address of the script runtime's debug agent (host:port)
    #[arg(long)]
    pub target: Option<String>,

    /// Project root breakpoint source paths are made relative to
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Script context to attach the debugger to
    #[arg(long)]
    pub script_context: Option<String>,

    /// Mirror the raw DAP wire traffic to this file
    #[arg(long)]
    pub wire_log: Option<PathBuf>,

    /// Configuration file (defaults to the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print help
    #[arg(short = '?', long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

/// Spin until a debugger attaches to the adapter process itself
///
/// Used to debug the adapter: launch it from the IDE, then attach a
/// native debugger before the DAP handshake starts.
pub fn wait_for_debugger() {
    tracing::info!("Waiting for a debugger to attach to the adapter process");

    #[cfg(target_os = "linux")]
    loop {
        let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
        let traced = status
            .lines()
            .find_map(|line| line.strip_prefix("TracerPid:"))
            .map(|pid| pid.trim() != "0")
            .unwrap_or(false);
        if traced {
            tracing::info!("Debugger attached");
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    #[cfg(not(target_os = "linux"))]
    tracing::warn!("--wait-for-debugger is not supported on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "lua-dap",
            "--target",
            "127.0.0.1:6777",
            "--verbose",
            "--wait-for-debugger",
        ]);
        assert_eq!(cli.target.as_deref(), Some("127.0.0.1:6777"));
        assert!(cli.wait_for_debugger);
        assert_eq!(cli.verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["lua-dap", "--verbose", "--quiet"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_question_mark_is_help() {
        let err = Cli::try_parse_from(["lua-dap", "-?"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
