//! Portclaim CLI
//!
//! Command-line interface for inspecting and exercising the port
//! reservation core. Note that reservations live in process memory:
//! commands that mutate state are mostly useful for scripting around
//! `watch` mode and for diagnostics.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use portclaim_core::{ConfigWatcher, PortAllocator, PortClaimConfig, SharedPortState};

#[derive(Parser)]
#[command(name = "portclaim")]
#[command(version = "1.0.4")]
#[command(about = "In-process TCP port reservation", long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Verbose diagnostics
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reserve a random free port
    Reserve {
        /// Lower bound (defaults to the configured minimum)
        #[arg(long)]
        min: Option<u32>,
        /// Upper bound (defaults to the configured maximum)
        #[arg(long)]
        max: Option<u32>,
    },
    /// Reserve a specific port
    Claim {
        /// Port number
        port: u32,
        /// Report a conflict as a normal outcome instead of an error
        #[arg(long)]
        soft: bool,
    },
    /// Release a previously reserved port
    Release {
        /// Port number
        port: u32,
    },
    /// Count free ports
    Count {
        #[arg(long, default_value_t = 0)]
        min: u32,
        #[arg(long, default_value_t = 65535)]
        max: u32,
    },
    /// List free ports in a range
    List {
        #[arg(long)]
        min: u32,
        #[arg(long)]
        max: u32,
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Re-run the OS in-use port scan and merge the result
    Scan,
    /// Watch the config file and fold changes into the allocator
    Watch,
}

fn load_config(path: &Option<String>) -> Result<PortClaimConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = PortClaimConfig::load(path)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(PortClaimConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let config = load_config(&cli.config)?;
    let allocator = Arc::new(PortAllocator::with_state(SharedPortState::global(), config));

    match cli.command {
        Commands::Reserve { min, max } => {
            let port = match (min, max) {
                (None, None) => allocator.get_random_free_port()?,
                (min, max) => {
                    let defaults = allocator.config();
                    allocator.get_random_free_port_in_range(
                        min.unwrap_or(defaults.default_min_port as u32),
                        max.unwrap_or(defaults.default_max_port as u32),
                    )?
                }
            };
            println!("{} reserved port {}", "✓".green(), port);
        }

        Commands::Claim { port, soft } => {
            if soft {
                if allocator.try_mark_used(port)? {
                    println!("{} reserved port {}", "✓".green(), port);
                } else {
                    println!("{} port {} already reserved", "-".yellow(), port);
                }
            } else {
                allocator.mark_used(port)?;
                println!("{} reserved port {}", "✓".green(), port);
            }
        }

        Commands::Release { port } => {
            if allocator.mark_free(port)? {
                println!("{} released port {}", "✓".green(), port);
            } else {
                println!("{} port {} was already free", "-".yellow(), port);
            }
        }

        Commands::Count { min, max } => {
            let count = allocator.get_free_port_count_in_range(min, max)?;
            println!("{} free ports in {}-{}", count, min, max);
        }

        Commands::List { min, max, format } => {
            let free = allocator.get_free_ports(min, max)?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string(&free)?),
                _ => {
                    println!("Free ports in {}-{} ({}):", min, max, free.len());
                    for port in free {
                        println!("  {}", port);
                    }
                }
            }
        }

        Commands::Scan => {
            if allocator.try_scan_in_use_ports() {
                println!("{} in-use scan merged", "✓".green());
            } else {
                println!("{} in-use scan failed, no exclusions added", "✗".red());
            }
        }

        Commands::Watch => {
            let config_path = cli
                .config
                .ok_or("watch mode requires --config <path>")?;

            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_flag = shutdown.clone();
            ctrlc::set_handler(move || {
                shutdown_flag.store(true, Ordering::SeqCst);
            })?;

            let watcher = ConfigWatcher::new(&config_path, allocator);
            println!("Watching {} (Ctrl+C to stop)", config_path);
            watcher.run(shutdown)?;
        }
    }

    Ok(())
}
