//! CLI tool for NetCPU Monitor (netcpu)

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use colored::Colorize;
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "netcpu")]
#[command(about = "NetCPU Monitor: CPU utilization of network devices over SSH, served to AI agents via MCP", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Device inventory file (YAML)
    #[arg(short, long, global = true, default_value = netcpulib::inventory::DEFAULT_INVENTORY_PATH)]
    inventory: PathBuf,

    /// Session timeout in seconds, unless a device sets its own
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Start MCP (Model Context Protocol) server on stdio (default)
    Serve,
    /// Query one device and print the result as JSON
    Query {
        /// Device name (defaults to the first inventory entry)
        #[arg(short, long)]
        device: Option<String>,
    },
    /// List inventory devices
    Devices,
    /// Parse captured 'show processes cpu' output from a file or stdin
    Parse {
        /// Capture file (stdin if not specified)
        file: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "[!]".red(), e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use netcpulib::{parse_cpu_utilization, Inventory, McpServer};
    use std::sync::Arc;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let inventory = Inventory::load(&cli.inventory)?;
            if inventory.is_empty() {
                log::warn!("No devices in {}; tool calls will fail", cli.inventory.display());
            }
            eprintln!("[*] Starting MCP (Model Context Protocol) server...");
            eprintln!("[*] Communicating via stdio (JSON-RPC 2.0)");

            let server = Arc::new(McpServer::new(operation(inventory, cli.timeout)));
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server.run_stdio())?;
        }

        Commands::Query { device } => {
            let inventory = Inventory::load(&cli.inventory)?;
            let result = operation(inventory, cli.timeout).get_cpu_utilization(device.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Devices => {
            let inventory = Inventory::load(&cli.inventory)?;
            if inventory.is_empty() {
                println!("No devices configured in {}", cli.inventory.display());
            }
            let default = inventory.default_device().map(|d| d.name.clone());
            for device in inventory.summaries() {
                let marker = if Some(&device.name) == default.as_ref() {
                    "*".green().bold().to_string()
                } else {
                    " ".to_string()
                };
                println!(
                    "{} {:<20} {}:{} ({})",
                    marker,
                    device.name.bold(),
                    device.host,
                    device.port,
                    device.device_type.cyan()
                );
            }
        }

        Commands::Parse { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => std::io::read_to_string(std::io::stdin())?,
            };
            println!("{}", serde_json::to_string_pretty(&parse_cpu_utilization(&raw))?);
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn operation(inventory: netcpulib::Inventory, timeout_secs: u64) -> netcpulib::TelemetryOperation {
    use netcpulib::{SessionProvider, TelemetryOperation};
    use std::sync::Arc;
    use std::time::Duration;

    let sessions = SessionProvider::ssh().with_timeout(Duration::from_secs(timeout_secs));
    TelemetryOperation::new(Arc::new(inventory), sessions)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
