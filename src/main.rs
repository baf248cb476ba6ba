//! lua-dap - Debug Adapter Protocol bridge to a remote Lua script runtime
//!
//! Binds a DAP session to stdin/stdout and relays debugging commands to
//! the script runtime's debug agent over TCP. stdout belongs to the DAP
//! wire; all diagnostics go to stderr and the adapter log.

use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;

use lua_dap::adapter::breakpoints::ProjectPaths;
use lua_dap::adapter::{self, AdapterSettings};
use lua_dap::cli::{self, Cli, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE};
use lua_dap::common::{config::Config, logging, Result};
use lua_dap::dap::WireLog;
use lua_dap::remote::transport::{TcpRemoteTools, UnconfiguredRemoteTools};
use lua_dap::remote::RemoteTools;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    EXIT_SUCCESS
                }
                _ => EXIT_USAGE,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let (log_path, _log_guard) = logging::init(cli.verbosity());
    if let Some(path) = &log_path {
        tracing::debug!("Adapter log: {}", path.display());
    }

    if cli.wait_for_debugger {
        cli::wait_for_debugger();
    }

    if let Err(e) = run(cli).await {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(EXIT_FAILURE);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // CLI flags override the config file field by field
    let target_addr = cli.target.or(config.target.address);
    let script_context = cli
        .script_context
        .unwrap_or(config.target.script_context);
    let project_root = cli.project_root.or(config.project.root);
    let wire_log_path = cli.wire_log.or(config.log.wire_log);

    let wire_log = match &wire_log_path {
        Some(path) => WireLog::open(path)?,
        None => WireLog::disabled(),
    };

    let tools: Box<dyn RemoteTools> = match target_addr {
        Some(addr) => {
            tracing::info!("Debug agent address: {addr}");
            Box::new(TcpRemoteTools::connect(addr))
        }
        None => {
            tracing::warn!("No target address configured; debugging commands will be dropped");
            Box::new(UnconfiguredRemoteTools)
        }
    };

    tracing::info!("Binding DAP session to stdin/stdout");
    adapter::serve(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        wire_log,
        tools,
        Box::new(ProjectPaths::new(project_root)),
        AdapterSettings { script_context },
        Duration::from_millis(config.scheduler.tick_ms),
    )
    .await
}
