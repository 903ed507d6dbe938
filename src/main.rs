//! Roto-Link
//!
//! Drives a Roto-Control surface from a host model.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roto_link::config::{AppConfig, ConfigWatcher};
use roto_link::driver::{self, SurfaceDriver};
use roto_link::engine::Engine;
use roto_link::host::{ConsoleHost, HostModel};
use roto_link::midi::format_hex;
use roto_link::sniffer;

/// Roto-Link - Sync a Roto-Control surface with a DAW
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print surface traffic instead of running the engine
    #[arg(long)]
    sniffer: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting Roto-Link...");
    info!("Configuration file: {}", args.config);

    if args.list_ports {
        let config = AppConfig::load(&args.config).await.ok();
        driver::print_ports(config.as_ref().map(|c| &c.midi))?;
        return Ok(());
    }

    let (config_watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
    info!("Configuration loaded successfully with hot-reload enabled");

    if args.sniffer {
        return sniffer::run_cli_sniffer(&config.midi.input_port).await;
    }

    run_app(config, config_watcher).await?;

    info!("Roto-Link shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, mut config_watcher: ConfigWatcher) -> Result<()> {
    let mut surface = SurfaceDriver::new(&config.midi);
    surface.connect()?;
    let mut surface_rx = surface
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Failed to get surface event receiver"))?;

    let mut host = ConsoleHost::new(&config.host);
    let span = info_span!("engine", host = host.name());
    let mut engine = Engine::new(config.engine.clone(), span);

    engine.start();
    engine.on_host_events(host.snapshot(), Instant::now());
    flush(&mut engine, &mut host, &surface);

    let mut ticker = tokio::time::interval(config.engine.tick_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("Ready to process MIDI events!");

    loop {
        tokio::select! {
            Some(event) = surface_rx.recv() => {
                debug!("Surface: {}", format_hex(&event.data));
                engine.on_midi(&event.data, event.timestamp);
            }

            _ = ticker.tick() => {
                engine.tick(Instant::now());
            }

            Some(new_config) = config_watcher.next_config() => {
                info!("📝 Configuration file changed, applying engine tuning");
                if new_config.engine.tick_interval() != ticker.period() {
                    ticker = tokio::time::interval(new_config.engine.tick_interval());
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                }
                engine.apply_tuning(new_config.engine);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
        flush(&mut engine, &mut host, &surface);
    }

    surface.disconnect();
    Ok(())
}

/// Execute queued host commands, feed their echoes back and send surface output
fn flush(engine: &mut Engine, host: &mut ConsoleHost, surface: &SurfaceDriver) {
    loop {
        let commands = engine.take_host_commands();
        if commands.is_empty() {
            break;
        }
        for command in &commands {
            let events = host.apply(command);
            engine.on_host_events(events, Instant::now());
        }
    }
    for frame in engine.take_outgoing() {
        if let Err(e) = surface.send_raw(&frame) {
            warn!("Failed to send to surface: {}", e);
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
