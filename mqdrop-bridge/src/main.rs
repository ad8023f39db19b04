//! mqdrop-bridge entry point.
//!
//! ```text
//! mqdrop-bridge                  Poll until Ctrl-C / SIGTERM
//! mqdrop-bridge --config <path>  Load a custom config TOML
//! mqdrop-bridge --gen-config     Write a config template to stdout
//! mqdrop-bridge --check          Validate the config and exit
//! mqdrop-bridge --once           Run one poll cycle and exit
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;

use mqdrop_bridge::config::BridgeConfig;
use mqdrop_bridge::logging;
use mqdrop_bridge::service::BridgeService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mqdrop-bridge", about = "Directory to message queue bridge")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mqdrop.toml")]
    config: PathBuf,

    /// Print a configuration template to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Run a single poll cycle; exit non-zero if it failed.
    #[arg(long)]
    once: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", BridgeConfig::template_toml()?);
        return Ok(());
    }

    let config = match BridgeConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            std::process::exit(2);
        }
    };

    if cli.check {
        println!("{}: ok", cli.config.display());
        return Ok(());
    }

    logging::init(&config.logging)?;
    info!("mqdrop-bridge v{}", env!("CARGO_PKG_VERSION"));

    let mut service = BridgeService::new(&config);

    if cli.once {
        let outcome = service.run_once().await;
        info!(?outcome, "single cycle finished");
        if outcome.is_failure() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let stop = service.stop_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested; finishing current cycle");
        stop.store(false, Ordering::SeqCst);
    });

    service.run().await;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
