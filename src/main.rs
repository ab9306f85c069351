use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use wiimo::config::{BackendKind, ConfigWatcher, OscOverrides, Settings};
use wiimo::controller::{LifecycleState, Manager, Transition};
use wiimo::hardware::simulated::SimulatedBackend;
use wiimo::hardware::{BackendFactory, HardwareError, MoteBackend};
use wiimo::mapping::OscMapping;
use wiimo::osc::{OscConfig, OscSender};

#[derive(Debug, Parser)]
#[command(name = "wiimo", version, about)]
struct Cli {
    /// Settings file (default: <config dir>/wiimo/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OSC receiver host, overrides the settings file
    #[arg(long)]
    host: Option<String>,

    /// OSC receiver port, overrides the settings file
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Use the simulated demo remote instead of real hardware
    #[arg(long)]
    simulate: bool,

    /// trace, debug, info, warn or error
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };
    let created = Settings::ensure_default(&config_path)?;
    let settings = Settings::load(&config_path)?;

    setup(cli.log_level.as_deref().unwrap_or(&settings.logging.level))?;
    if created {
        info!("Created default settings at {}", config_path.display());
    }
    info!("Using settings from {}", config_path.display());

    let overrides = OscOverrides {
        host: cli.host.clone(),
        port: cli.port,
    };
    let backend = if cli.simulate {
        BackendKind::Simulated
    } else {
        settings.controller.backend
    };

    let cancel = CancellationToken::new();
    let (watcher, mut osc_rx) = ConfigWatcher::new(
        config_path.clone(),
        overrides,
        settings.config_poll_interval(),
        settings.osc.clone(),
    );
    let watcher_handle = watcher.spawn(cancel.clone());

    let sender = Arc::new(parking_lot::Mutex::new(OscSender::new()));
    apply_target(&sender, &osc_rx.borrow_and_update());

    let mut manager = Manager::new(settings.worker_settings(), backend_factory(backend)?);
    let mapping = OscMapping::default();
    let callback_sender = sender.clone();
    manager.on_controller_events(move |events| {
        for (button, transition) in events.changed_buttons() {
            let state = if transition == Transition::Pressed {
                "pressed"
            } else {
                "released"
            };
            info!("Remote {}: {} {}", events.id, button, state);
        }
        let mut sender = callback_sender.lock();
        mapping.translate(events, &mut *sender);
    });

    manager
        .init()
        .map_err(|e| eyre!("Failed to start controller polling: {}", e))?;

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
        ctrl_c.cancel();
    });

    let mut ticker = tokio::time::interval(settings.update_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut delivered: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        delivered += manager.update() as u64;

        if osc_rx.has_changed().unwrap_or(false) {
            apply_target(&sender, &osc_rx.borrow_and_update());
        }

        if manager.state() == LifecycleState::Stopped {
            // last records published before the worker ended
            delivered += manager.update() as u64;
            info!("Controller polling has stopped");
            break;
        }
    }

    cancel.cancel();
    manager.shutdown();
    sender.lock().close();
    if let Err(e) = watcher_handle.await {
        warn!("Config watcher ended abnormally: {}", e);
    }
    info!("Delivered {} controller records", delivered);
    Ok(())
}

fn setup(level: &str) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(level);
    Ok(())
}

fn setup_logging_env(level: &str) {
    let level = match level.parse::<Level>() {
        Ok(level) => level,
        Err(_) => {
            eprintln!("Unknown log level '{}', using info", level);
            Level::INFO
        }
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn apply_target(sender: &parking_lot::Mutex<OscSender>, target: &OscConfig) {
    let mut sender = sender.lock();
    sender.setup(&target.host, target.port);
    info!("OSC {} ({})", sender.status_text(), target);
    debug!("OSC status: {:?}", sender.status());
}

fn backend_factory(kind: BackendKind) -> Result<BackendFactory> {
    match kind {
        BackendKind::Simulated => {
            info!("Using simulated remote");
            Ok(Arc::new(|| -> Result<Box<dyn MoteBackend>, HardwareError> {
                Ok(Box::new(SimulatedBackend::demo()))
            }))
        }
        BackendKind::Hid => hid_factory(),
    }
}

#[cfg(feature = "hid")]
fn hid_factory() -> Result<BackendFactory> {
    use wiimo::hardware::hid::HidBackend;

    Ok(Arc::new(|| -> Result<Box<dyn MoteBackend>, HardwareError> {
        Ok(Box::new(HidBackend::new()))
    }))
}

#[cfg(not(feature = "hid"))]
fn hid_factory() -> Result<BackendFactory> {
    Err(eyre!(
        "Built without HID support, use --simulate or backend = \"simulated\""
    ))
}
