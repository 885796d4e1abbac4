//! mbot-console: terminal teleoperation console for MBot robots.
//! Single-threaded: one tokio task owns all console state.

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;

use mbot_console_runtime::bridge::BridgeClient;
use mbot_console_runtime::cli::Cli;
use mbot_console_runtime::commands::{self, HELP};
use mbot_console_runtime::config;
use mbot_console_runtime::confirm::ConsoleConfirm;
use mbot_console_runtime::console::{Console, ConsoleOptions};
use mbot_console_runtime::scene::{HeadlessScene, Surface};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let filter = std::env::var("MBOT_CONSOLE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let mut settings = config::load(args.config.as_deref())?;
    settings.apply_overrides(&args);
    settings.validate()?;

    tracing::info!("mbot-console starting, bridge at {}", settings.bridge.address);

    let client = BridgeClient::new(
        settings.bridge.address.clone(),
        settings.channels.clone(),
        settings.request_timeout(),
    );
    let options = ConsoleOptions {
        heartbeat_period: settings.heartbeat_period(),
        map_poll_period: settings.map_poll_period(),
        toggles: settings.display.toggles(),
        surface: Surface {
            width_px: settings.scene.width_px,
            height_px: settings.scene.height_px,
            pixels_per_meter: settings.scene.pixels_per_meter,
        },
        export_dir: args.export_dir.clone(),
    };
    let mut console = Console::new(
        client,
        HeadlessScene::default(),
        ConsoleConfirm::from(args.confirm),
        options,
    );

    let (tx, rx) = mpsc::channel(1);
    commands::spawn_stdin_reader(tx).context("failed to start command reader")?;
    eprintln!("{HELP}");

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to register SIGTERM handler")?;

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    console.run(rx, shutdown).await;
    Ok(())
}
