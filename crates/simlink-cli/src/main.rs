//! simlink server
//!
//! Serves the JSON line protocol on stdin/stdout for an external peer.
//! Lines that are not JSON run as console commands. Logs go to stderr.
//! The process keeps serving after stdin closes and stops on ctrl-c.

use anyhow::{Context, Result};
use clap::Parser;
use simlink_bridge::{
    CommandContext, HeadlessHost, LifecycleBridge, ServerInfo, ServerRuntime, SimulationHost,
    register_handlers, register_headless_commands, register_server_commands,
};
use simlink_console::{CommandHandler, CommandResolver, DEFAULT_CONFIRM_TOKEN};
use simlink_core::{MapInfo, SettingsStore};
use simlink_server::{Gateway, SimlinkServer};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Name reported in `HELLO` replies
const SERVER_NAME: &str = "simlink-server";

#[derive(Parser, Debug)]
#[command(name = "simlink-server", version, about)]
struct Args {
    /// Settings file
    #[arg(long, default_value = "simlink-settings.json")]
    settings: PathBuf,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maps offered by the headless host (repeatable)
    #[arg(long = "map", default_values_t = [
        "Ground Zero".to_string(),
        "Frozen Forest".to_string(),
        "The Craters".to_string(),
    ])]
    maps: Vec<String>,

    /// Confirmation word never offered as a command suggestion
    #[arg(long, default_value = DEFAULT_CONFIRM_TOKEN)]
    confirm_token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("simlink server v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = SettingsStore::open(&args.settings)
        .with_context(|| format!("loading settings from {}", args.settings.display()))?;
    let runtime = Arc::new(ServerRuntime::load(settings));
    if let Err(e) = runtime.save() {
        warn!("Could not write settings: {}", e);
    }

    let headless = Arc::new(HeadlessHost::new(
        args.maps.iter().map(MapInfo::new).collect(),
    ));
    headless.set_shuffle_mode(runtime.shuffle_mode());
    let host: Arc<dyn SimulationHost> = headless.clone();

    let mut gateway = Gateway::stdout();
    register_handlers(
        &mut gateway,
        host.clone(),
        ServerInfo::new(SERVER_NAME, env!("CARGO_PKG_VERSION")),
    );
    let gateway = Arc::new(gateway);

    let bridge = LifecycleBridge::new(gateway.clone(), host.clone(), runtime.clone());
    let pause_state = bridge.subscribe();
    let (lifecycle, bridge_task) = bridge.spawn();
    host.subscribe(lifecycle.clone());

    let mut handler = CommandHandler::new();
    register_headless_commands(&mut handler, headless, runtime.clone())?;
    register_server_commands(
        &mut handler,
        CommandContext {
            host,
            runtime,
            lifecycle,
            pause_state,
        },
    )?;
    info!("Registered {} console commands", handler.commands().len());

    let resolver = CommandResolver::with_confirm_token(Arc::new(handler), args.confirm_token);
    let server = SimlinkServer::new(gateway, Arc::new(resolver));
    let pump = server.run_stdio()?;

    serve_until(
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
            }
        },
        pump,
    )
    .await;

    // the host and a possibly blocked input thread still own senders
    drop(server);
    bridge_task.abort();
    match bridge_task.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!("Lifecycle bridge task failed: {}", e),
    }

    info!("simlink server stopped");
    Ok(())
}

/// Serve until `shutdown` resolves. The pump's outcome is logged when it
/// arrives; end of input does not stop the server.
async fn serve_until<F>(shutdown: F, pump: oneshot::Receiver<simlink_core::Result<()>>)
where
    F: Future<Output = ()>,
{
    let pump_done = async {
        match pump.await {
            Ok(Ok(())) => info!("Input closed, still serving until interrupted"),
            Ok(Err(e)) => error!("Input pump failed: {}", e),
            Err(_) => error!("Input pump exited without reporting"),
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = shutdown => info!("Interrupted, shutting down"),
        _ = pump_done => {}
    }
}
