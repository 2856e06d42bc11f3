//! freecad-mcp: MCP server exposing a running FreeCAD instance over stdio.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use freecad_mcp::config;
use freecad_mcp::feedback::FeedbackMode;
use freecad_mcp::freecad::{Connector, HttpConnector};
use freecad_mcp::mcp::{McpServer, ToolDispatcher};

/// MCP server that lets AI assistants model in a running FreeCAD.
///
/// Requires the FreeCAD MCP addon with its RPC server started.
#[derive(Parser, Debug)]
#[command(name = "freecad-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Never attach screenshots to tool results
    #[arg(long)]
    only_text_feedback: bool,

    /// FreeCAD RPC host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// FreeCAD RPC port (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
}

/// Determines the log level from CLI arguments.
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => config_level.parse().unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig was read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    if let Some(host) = args.host {
        cfg.freecad.host = host;
    }
    if let Some(port) = args.port {
        cfg.freecad.port = port;
    }
    if let Err(e) = cfg.validate() {
        eprintln!("Configuration error: {e}");
        return ExitCode::FAILURE;
    }
    let mode = FeedbackMode::from_only_text(args.only_text_feedback || cfg.feedback.only_text);

    init_tracing(get_log_level(args.verbose, args.quiet, &cfg.logging.level));

    let connector = HttpConnector::new(cfg.freecad.host, cfg.freecad.port);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        freecad = %connector.address(),
        ?mode,
        "Starting freecad-mcp server"
    );

    let mut server = McpServer::new(ToolDispatcher::new(connector, mode));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
