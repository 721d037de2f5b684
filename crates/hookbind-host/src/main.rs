mod actions;
mod config;
mod console;
mod demo;
mod host;
mod managers;
mod script_manager;
mod script_options;

use std::path::Path;
use std::time::Duration;

use config::HostConfig;
use host::ServerHost;
use script_options::ScriptOptionsFile;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

const CONFIG_PATH: &str = "host.toml";

fn flush_outbox(host: &mut ServerHost) {
    for delivery in host.drain_outbox() {
        info!("{delivery}");
    }
}

#[tokio::main]
async fn main() {
    let config = if Path::new(CONFIG_PATH).exists() {
        match HostConfig::load(CONFIG_PATH) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load {CONFIG_PATH}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        HostConfig::default()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let options = match ScriptOptionsFile::load(&config.paths.scripts) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config.paths.scripts);
            std::process::exit(1);
        }
    };

    info!(
        "hookbind host v{} starting ({} ms per tick)",
        env!("CARGO_PKG_VERSION"),
        config.host.tick_millis
    );
    info!(
        "Integrations: protocol={}, placeholders={}, pubsub={}",
        config.integrations.protocol, config.integrations.placeholders, config.integrations.pubsub
    );
    info!("Script configs in {}", config.paths.configs);

    let mut host = ServerHost::new(&config, options);
    for script in demo::all() {
        host.add_script(script);
    }
    let failures = host.start_all();
    info!(
        "{} scripts running, {} failed to start",
        host.scripts().running().len(),
        failures.len()
    );

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            // keep trailing whitespace, tab completion reads it
            if !line.trim().is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut tick_interval = tokio::time::interval(Duration::from_millis(config.host.tick_millis.max(1)));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                host.tick();
                flush_outbox(&mut host);
            }
            Some(line) = console_rx.recv() => {
                let output = console::handle_line(&mut host, &line);
                for line in &output.lines {
                    info!("{line}");
                }
                flush_outbox(&mut host);
                if output.should_stop {
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    host.unload_all();
    if !host.facade().is_empty() {
        warn!("{} registrations left after unload", host.facade().len());
    }
    info!("Host shut down.");
}
