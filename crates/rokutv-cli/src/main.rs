//! Command-line interface for the Roku TV bridge.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rokutv_accessory::{DiscoveryCoordinator, InMemoryAccessoryRepository, RokuTvPlatform};
use rokutv_core::config::env_vars;
use rokutv_core::{DeviceAddress, DeviceKey, EventBus, PlatformConfig};
use rokutv_devices::{
    DeviceController, DeviceDiscoverer, EcpClient, SsdpDiscoverer, StaticDiscoverer,
    TimedController,
};

/// Roku TV bridge - expose Roku TVs as television accessories.
#[derive(Parser, Debug)]
#[command(name = "rokutv")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Discover devices, publish accessories and keep them in sync until Ctrl-C.
    Run {
        /// Platform config file (JSON). Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List Roku devices found on the network.
    Discover {
        /// SSDP listen window in milliseconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Send one remote key to a device.
    Key {
        /// Device address (host or host:port).
        address: String,
        /// Key name, e.g. Home, Select, PowerOff.
        key: String,
    },
    /// Launch an app on a device by its id.
    Launch {
        /// Device address (host or host:port).
        address: String,
        /// App id as listed by `info`.
        app_id: String,
    },
    /// Print a device's info block, app list and foreground app.
    Info {
        /// Device address (host or host:port).
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Check if JSON logging is requested (for production/container environments)
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if args.verbose { "rokutv=debug" } else { "rokutv=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }

    match args.command {
        Command::Run { config } => run_platform(config).await,
        Command::Discover { timeout } => discover(timeout).await,
        Command::Key { address, key } => send_key(&address, &key).await,
        Command::Launch { address, app_id } => launch(&address, &app_id).await,
        Command::Info { address } => info(&address).await,
    }
}

fn load_config(path: Option<PathBuf>) -> Result<PlatformConfig> {
    match path {
        Some(path) => PlatformConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let mut config = PlatformConfig::default();
            config.apply_env();
            config.validate()?;
            Ok(config)
        }
    }
}

fn controller_for(address: &str) -> Result<TimedController<EcpClient>> {
    let address: DeviceAddress = address
        .parse()
        .with_context(|| format!("Invalid device address: {}", address))?;
    let config = PlatformConfig::default();
    Ok(TimedController::new(EcpClient::new(address), config.request_timeout()))
}

/// Run the platform until Ctrl-C.
async fn run_platform(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let event_bus = EventBus::new();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let follower = repository.clone().follow(&event_bus);

    let platform = RokuTvPlatform::from_config(config, repository.clone(), event_bus.clone())?;
    let accessories = platform.did_finish_launching().await;
    if accessories.is_empty() {
        tracing::warn!("No Roku devices found");
    }
    for accessory in &accessories {
        println!(
            "{}  {}  ({} inputs)",
            accessory.uuid(),
            accessory.descriptor().display_name(),
            accessory.inputs().len()
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");

    platform.shutdown().await;
    follower.abort();
    Ok(())
}

async fn discover(timeout: Option<u64>) -> Result<()> {
    let mut config = PlatformConfig::default();
    if let Some(ms) = timeout {
        config.discovery_timeout = ms;
    }
    let discoverer: Arc<dyn DeviceDiscoverer> = Arc::new(SsdpDiscoverer::new(
        config.discovery_timeout(),
        config.request_timeout(),
    ));
    print_devices(DiscoveryCoordinator::new(discoverer)).await
}

async fn print_devices(coordinator: DiscoveryCoordinator) -> Result<()> {
    let devices = coordinator.discover().await?;
    if devices.is_empty() {
        println!("No Roku devices found.");
        return Ok(());
    }
    for device in &devices {
        let info = &device.descriptor.info;
        println!("{}", device.descriptor.address);
        println!("  Name:   {}", device.descriptor.display_name());
        println!("  Model:  {} {}", info.vendor_name, info.model_name);
        println!("  Serial: {}", info.serial_number);
        println!("  Power:  {}", info.power_mode);
        println!("  Apps:   {}", device.descriptor.apps.len());
    }
    Ok(())
}

async fn send_key(address: &str, key: &str) -> Result<()> {
    let key: DeviceKey = key.parse()?;
    let controller = controller_for(address)?;
    controller.send_key(key).await?;
    println!("Sent {} to {}", key, controller.address());
    Ok(())
}

async fn launch(address: &str, app_id: &str) -> Result<()> {
    let controller = controller_for(address)?;
    controller.launch(app_id).await?;
    println!("Launched {} on {}", app_id, controller.address());
    Ok(())
}

async fn info(address: &str) -> Result<()> {
    let controller = controller_for(address)?;
    let address = controller.address().clone();

    // Reuse discovery's description so the output matches what `run` sees.
    let discoverer: Arc<dyn DeviceDiscoverer> = Arc::new(StaticDiscoverer::new(
        vec![address.clone()],
        PlatformConfig::default().request_timeout(),
    ));
    let devices = DiscoveryCoordinator::new(discoverer).discover().await?;
    let Some(device) = devices.into_iter().next() else {
        anyhow::bail!("Device {} did not answer", address);
    };

    let active = controller.query_active_app().await?;
    let apps: Vec<serde_json::Value> = device
        .descriptor
        .app_map()
        .all()
        .iter()
        .map(|app| {
            serde_json::json!({
                "id": app.remote_id,
                "localId": app.local_id.value(),
                "name": app.name,
                "type": app.kind,
            })
        })
        .collect();
    let output = serde_json::json!({
        "address": address.to_string(),
        "info": device.descriptor.info,
        "apps": apps,
        "activeApp": active,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
