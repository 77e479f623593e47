//! telemetry-server: CLI + web server for WSPR and rtl_433 telemetry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use telemetry_core::config::{self, Config};
use telemetry_core::types::ObjectSnapshot;
use telemetry_core::{locator, MessageFormat, TelemetryRegistry};

mod input;
mod notification;
mod observer;
mod sweeper;
mod web;

use notification::WebhookDispatcher;
use observer::TracingObserver;

#[derive(Parser)]
#[command(name = "telemetry", version, about = "WSPR and rtl_433 telemetry tracker")]
struct Cli {
    /// Log filter directive (overrides the config file), e.g. `debug`
    #[arg(long, global = true, env = "TELEMETRY_LOG")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode Maidenhead locators and print their cells
    Locate {
        /// One or more 2-, 4- or 6-character locators
        #[arg(required = true)]
        locators: Vec<String>,
    },

    /// Replay decoder output from a file and print the resident objects
    Track {
        /// Path to decoder output (one record per line), or `-` for stdin
        file: PathBuf,

        /// Line format of the input
        #[arg(short, long, default_value = "wsprd")]
        format: MessageFormat,

        /// Timestamp for lines before the first `;<timestamp>` suffix
        #[arg(long, default_value = "0")]
        start: f64,
    },

    /// Run the HTTP API with a live registry
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Seconds between expiry sweeps
        #[arg(long)]
        sweep_interval: Option<f64>,

        /// URL that receives created/expired events
        #[arg(long, env = "TELEMETRY_WEBHOOK")]
        webhook: Option<String>,

        /// Bearer token required by the ingest endpoint
        #[arg(long, env = "TELEMETRY_AUTH_TOKEN")]
        auth_token: Option<String>,
    },

    /// Write the default config file
    Config {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = config::load_config();

    // --log / TELEMETRY_LOG, then RUST_LOG, then the config file.
    let filter = match cli.log.as_deref() {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env()
            .ok()
            .or_else(|| EnvFilter::try_new(&config.log.level).ok()),
    }
    .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Locate { locators } => cmd_locate(&locators),
        Commands::Track {
            file,
            format,
            start,
        } => cmd_track(file, format, start),
        Commands::Serve {
            host,
            port,
            sweep_interval,
            webhook,
            auth_token,
        } => cmd_serve(
            config,
            ServeArgs {
                host,
                port,
                sweep_interval,
                webhook,
                auth_token,
            },
        ),
        Commands::Config { force } => cmd_config(force),
    }
}

fn cmd_locate(locators: &[String]) {
    let mut table = Table::new();
    table.set_header(vec![
        "Locator", "South", "West", "Center lat", "Center lon", "Size",
    ]);

    let mut failed = false;
    for loc in locators {
        match locator::cell(loc) {
            Ok(cell) => {
                let (south, west) = cell.corner();
                let (lat, lon) = cell.center();
                table.add_row(vec![
                    Cell::new(loc.to_uppercase()),
                    Cell::new(format!("{south:.4}")),
                    Cell::new(format!("{west:.4}")),
                    Cell::new(format!("{lat:.4}")),
                    Cell::new(format!("{lon:.4}")),
                    Cell::new(format!("{}° x {}°", cell.lat_size, cell.lon_size)),
                ]);
            }
            Err(e) => {
                eprintln!("{e}");
                failed = true;
            }
        }
    }

    println!("{table}");
    if failed {
        std::process::exit(1);
    }
}

fn cmd_track(file: PathBuf, format: MessageFormat, start: f64) {
    let reader = input::open_input(&file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });

    let registry = TelemetryRegistry::new(Arc::new(TracingObserver));
    let summary = input::replay(reader, format, &registry, start);

    println!();
    println!("Track complete: {} ({format})", file.display());
    println!(
        "  Lines: {} read, {} accepted, {} rejected",
        summary.lines, summary.accepted, summary.rejected
    );
    println!(
        "  Objects: {} created, {} expired, {} resident",
        summary.created,
        summary.expired,
        registry.len()
    );

    let active = registry.list_active(summary.last_timestamp);
    if !active.is_empty() {
        println!();
        println!("{}", objects_table(&active));
    }
}

fn objects_table(objects: &[ObjectSnapshot]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Id", "Kind", "Last heard", "Lat", "Lon", "Fields"]);

    for obj in objects {
        let fields = obj
            .fields
            .iter()
            .filter(|f| !f.key.starts_with("last_heard"))
            .map(|f| match f.unit {
                Some(unit) => format!("{}={} {unit}", f.key, f.value),
                None => format!("{}={}", f.key, f.value),
            })
            .collect::<Vec<_>>()
            .join(" ");

        table.add_row(vec![
            Cell::new(&obj.id),
            Cell::new(obj.kind),
            Cell::new(
                obj.last_heard
                    .map(|t| format!("{t:.0}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                obj.track
                    .latitude
                    .map(|l| format!("{:.4}", l.value))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                obj.track
                    .longitude
                    .map(|l| format!("{:.4}", l.value))
                    .unwrap_or("-".into()),
            ),
            Cell::new(fields),
        ]);
    }

    table
}

struct ServeArgs {
    host: Option<String>,
    port: Option<u16>,
    sweep_interval: Option<f64>,
    webhook: Option<String>,
    auth_token: Option<String>,
}

fn cmd_serve(config: Config, args: ServeArgs) {
    let host = args.host.unwrap_or(config.dashboard.host);
    let port = args.port.unwrap_or(config.dashboard.port);
    let sweep_secs = args
        .sweep_interval
        .unwrap_or(config.registry.sweep_interval_secs);
    let sweep_interval = Duration::try_from_secs_f64(sweep_secs)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| {
            eprintln!("Invalid sweep interval {sweep_secs}");
            std::process::exit(1);
        });

    let webhook = args
        .webhook
        .or(config.webhook)
        .map(|url| WebhookDispatcher::new(&url));
    let auth_token = args.auth_token.or(config.auth_token);

    let state = Arc::new(web::AppState {
        registry: Arc::new(TelemetryRegistry::new(Arc::new(TracingObserver))),
        webhook,
        auth_token,
    });

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Error starting runtime: {e}");
        std::process::exit(1);
    });

    if let Err(e) = runtime.block_on(web::serve(state, host, port, sweep_interval)) {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

fn cmd_config(force: bool) {
    let path = config::config_file();
    if path.exists() && !force {
        eprintln!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
        std::process::exit(1);
    }

    match config::save_config(&Config::default()) {
        Ok(path) => info!(path = %path.display(), "wrote default config"),
        Err(e) => {
            eprintln!("Error writing config: {e}");
            std::process::exit(1);
        }
    }
}
