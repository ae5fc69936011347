//! crdkv - A Single-Node Key-Value Store over HTTP
//!
//! Main entry point: parses configuration, hydrates the entry table from
//! the snapshot file, serves the HTTP API and writes the snapshot back on
//! shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use crdkv::api::{router, AppState};
use crdkv::service::KvService;
use crdkv::storage::{start_sweeper, Snapshot};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Directory holding the snapshot file
    data_dir: String,
    /// Worker threads for the request pool
    workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crdkv::DEFAULT_HOST.to_string(),
            port: crdkv::DEFAULT_PORT,
            data_dir: ".".to_string(),
            workers: 5,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--data-dir" | "-d" => {
                    if i + 1 < args.len() {
                        config.data_dir = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --data-dir requires a value");
                        std::process::exit(1);
                    }
                }
                "--workers" | "-w" => {
                    if i + 1 < args.len() {
                        config.workers = parse_workers(&args[i + 1]).unwrap_or_else(|| {
                            eprintln!("Error: worker count must be a positive number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --workers requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("crdkv version {}", crdkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
crdkv - A Single-Node Key-Value Store over HTTP

USAGE:
    crdkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 8080)
    -d, --data-dir <DIR>     Directory for the snapshot file (default: .)
    -w, --workers <N>        Worker threads for the request pool (default: 5)
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    crdkv                              # Start on 127.0.0.1:8080
    crdkv --port 9090                  # Start on port 9090
    crdkv --data-dir /var/lib/crdkv    # Keep the snapshot elsewhere

API:
    GET    /api/crd/data?key=<key>     Read an entry
    POST   /api/crd/data?key=<key>     Create an entry (JSON body, optional
                                       "timeToLive" field in seconds)
    DELETE /api/crd/data?key=<key>     Delete an entry
"#
    );
}

/// Parses the worker count, rejecting zero: the runtime builder panics
/// on an empty worker pool.
fn parse_workers(raw: &str) -> Option<usize> {
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

fn worker_thread_name() -> String {
    static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
    let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
    format!("crdkv-wrk-{}", id)
}

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Build the bounded worker pool explicitly so the request concurrency
    // is configurable rather than whatever the machine happens to have.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name_fn(worker_thread_name)
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    // Hydrate the table from the snapshot. A corrupt or oversized
    // snapshot aborts initialization; starting with silently missing data
    // would be worse than not starting.
    let snapshot = Snapshot::new(&config.data_dir);
    let table = Arc::new(
        snapshot
            .load()
            .with_context(|| format!("failed to load snapshot from {}", config.data_dir))?,
    );
    info!(keys = table.len(), "entry table initialized");

    // Start the background expiry sweeper
    let _sweeper = start_sweeper(Arc::clone(&table));

    let state = Arc::new(AppState {
        service: KvService::new(Arc::clone(&table)),
    });
    let app = router(state);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("crdkv v{} listening on {}", crdkv::VERSION, config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush the table exactly once at shutdown. Failure here is logged
    // but must not prevent process exit.
    if let Err(e) = snapshot.save(&table) {
        error!("failed to save snapshot on shutdown: {}", e);
    }

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received, stopping server...");
}
