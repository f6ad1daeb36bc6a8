use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use adb_mcp::config::{load_config, ServerConfig};
use adb_mcp::errors::AdbMcpError;
use adb_mcp::mcp::{standard_registry, McpServer, ToolContext};
use adb_mcp::process::SystemExecutor;

/// Android device control and builds for AI assistants, over MCP on stdio.
#[derive(Parser)]
#[command(name = "adb-mcp", version, about = "MCP server for adb and Gradle")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// adb program to run (name on PATH or path)
    #[arg(long, global = true)]
    adb: Option<PathBuf>,
    /// Device command timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Gradle build timeout in seconds
    #[arg(long, global = true)]
    build_timeout: Option<u64>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP requests on stdin/stdout (default)
    Serve,
    /// Print the registered tools as JSON
    Tools,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr; stdout carries only protocol responses.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn run(cli: Cli) -> adb_mcp::errors::Result<()> {
    let config = resolve_config(&cli)?;
    let registry = standard_registry()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Tools => {
            let tools = registry.definitions();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Commands::Serve => {
            tracing::info!(
                adb = %config.adb_path.display(),
                command_timeout_secs = config.command_timeout_secs,
                build_timeout_secs = config.build_timeout_secs,
                "starting adb-mcp"
            );
            let executor = Arc::new(SystemExecutor::new(config.drain_grace()));
            let server = McpServer::new(registry, ToolContext::new(executor, config));

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| AdbMcpError::Config {
                    message: format!("failed to build tokio runtime: {}", e),
                })?;
            runtime.block_on(server.run())?;
        }
    }
    Ok(())
}

/// Loads the config file, then applies command-line overrides.
fn resolve_config(cli: &Cli) -> adb_mcp::errors::Result<ServerConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(adb) = &cli.adb {
        config.adb_path = adb.clone();
    }
    if let Some(secs) = cli.timeout {
        config.command_timeout_secs = secs;
    }
    if let Some(secs) = cli.build_timeout {
        config.build_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}
