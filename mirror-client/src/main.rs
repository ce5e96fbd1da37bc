//! Device mirror client.
//!
//! Startup sequence:
//!
//!   1. adb bootstrap  — start-server, port forward
//!   2. discovery      — wait for a device, read its geometry
//!   3. app lifecycle  — install/launch the companion app, start the
//!                       stream server
//!   4. services       — capture loop, input pipeline, dispatcher
//!   5. viewer         — terminal UI until quit, then teardown in
//!                       reverse

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mirror_core::capture::{CaptureConfig, CaptureService};
use mirror_core::dispatch::CommandDispatcher;
use mirror_core::geometry::DeviceGeometry;
use mirror_core::input::InputPipeline;

use mirror_client::adb::{AdbBridge, DeviceInfo};
use mirror_client::config::ClientConfig;
use mirror_client::viewer;

/// Mirror an attached device's screen into the terminal.
#[derive(Parser, Debug)]
#[command(name = "mirror-client", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "mirror-client.toml")]
    config: PathBuf,

    /// Override the streaming host.
    #[arg(long)]
    host: Option<String>,

    /// Target device serial.
    #[arg(long)]
    serial: Option<String>,

    /// Run without the terminal viewer (capture and input services
    /// only, until Ctrl+C).
    #[arg(long)]
    headless: bool,

    /// Print a default configuration file and exit.
    #[arg(long)]
    gen_config: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.gen_config {
        match toml::to_string_pretty(&ClientConfig::default()) {
            Ok(text) => print!("{text}"),
            Err(e) => eprintln!("failed to render config: {e}"),
        }
        return;
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(serial) = cli.serial {
        config.adb.serial = Some(serial);
    }

    // Logs go to stderr so they never corrupt the viewer's stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(config, cli.headless).await {
        error!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig, headless: bool) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();

    let adb = Arc::new(AdbBridge::new(&config.adb));
    adb.bootstrap(config.network.port, config.adb.remote_port)
        .await?;

    let Some(info) = wait_for_device(&adb, &config, &shutdown).await else {
        return Ok(());
    };
    info!(
        model = %info.model,
        width = info.screen_width,
        height = info.screen_height,
        "device discovered"
    );

    if adb.ensure_app_installed().await? {
        adb.start_app().await?;
        // Give the activity time to come up before poking it.
        tokio::time::sleep(Duration::from_secs(3)).await;
        adb.start_stream_server().await?;
    } else {
        warn!("continuing without the companion app; expecting a server on the forwarded port");
    }

    let geometry = DeviceGeometry::for_device(info.screen_width, info.screen_height);

    let dispatcher = CommandDispatcher::spawn(adb.clone(), shutdown.clone());
    let commands = dispatcher.sender();

    let capture = CaptureService::new(
        CaptureConfig {
            host: config.network.host.clone(),
            port: config.network.port,
            reconnect_delay: Duration::from_millis(config.network.reconnect_delay_ms),
        },
        shutdown.clone(),
    );
    let frame_rx = capture.frame_receiver();
    let stats_rx = capture.stats_receiver();
    let capture_task = tokio::spawn(capture.run());

    let (pipeline, pointer) = InputPipeline::spawn(geometry, commands.clone(), shutdown.clone());

    if headless {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => shutdown.cancel(),
        }
    } else {
        let result = viewer::run(
            frame_rx,
            stats_rx,
            pointer,
            commands,
            shutdown.clone(),
            info.model.clone(),
            config.input.forward_keyboard,
        )
        .await;
        shutdown.cancel();
        if let Err(e) = result {
            warn!("viewer exited with error: {e}");
        }
    }

    info!("shutting down");
    pipeline.join().await;
    dispatcher.join().await;
    if let Err(e) = capture_task.await {
        warn!("capture task panicked: {e}");
    }

    if let Err(e) = adb.stop_stream_server().await {
        warn!("failed to stop stream server: {e}");
    }
    if let Err(e) = adb.stop_app().await {
        warn!("failed to stop companion app: {e}");
    }

    Ok(())
}

/// Poll adb until a usable device shows up or shutdown is requested.
async fn wait_for_device(
    adb: &AdbBridge,
    config: &ClientConfig,
    shutdown: &CancellationToken,
) -> Option<DeviceInfo> {
    let retry = Duration::from_millis(config.adb.discovery_retry_ms);
    loop {
        match adb.discover().await {
            Ok(info) => return Some(info),
            Err(e) => info!("waiting for device: {e}"),
        }
        tokio::select! {
            _ = shutdown.cancelled() => return None,
            _ = tokio::signal::ctrl_c() => {
                shutdown.cancel();
                return None;
            }
            _ = tokio::time::sleep(retry) => {}
        }
    }
}
