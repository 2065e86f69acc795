//! Runs the BBS against a live APRS-IS server.
//!
//! ```text
//! APRSBBS_CALL=N0CALL-10 APRSBBS_DB=bbs.sqlite3 cargo run -p aprsbbs-gateway
//! APRSBBS_CONFIG=bbs.json cargo run -p aprsbbs-gateway
//! ```
//!
//! `RUST_LOG` controls verbosity (default `info`).

use std::time::Duration;

use aprsbbs::prelude::*;
use tracing_subscriber::EnvFilter;

const MIN_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Reads `APRSBBS_CONFIG` (JSON) if set, then applies the individual
/// `APRSBBS_*` overrides.
fn load_config() -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let mut config = match env("APRSBBS_CONFIG") {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
        None => {
            let call = env("APRSBBS_CALL").ok_or("set APRSBBS_CALL or APRSBBS_CONFIG")?;
            GatewayConfig::new(Identity::new(&call)?)
        }
    };

    if let Some(call) = env("APRSBBS_CALL") {
        config.identity = Identity::new(&call)?;
    }
    if let Some(passcode) = env("APRSBBS_PASSCODE") {
        config.passcode = Some(passcode.parse()?);
    }
    if let Some(host) = env("APRSBBS_HOST") {
        config.host = host;
    }
    if let Some(port) = env("APRSBBS_PORT") {
        config.port = port.parse()?;
    }
    if let Some(filter) = env("APRSBBS_FILTER") {
        config.filter = Some(filter);
    }
    if let Some(path) = env("APRSBBS_DB") {
        config.database_path = Some(path.into());
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    tracing::info!(
        identity = %config.identity,
        server = %format!("{}:{}", config.host, config.port),
        "starting aprsbbs"
    );

    let gateway = GatewayBuilder::from_config(config).build()?;
    let shutdown = gateway.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            shutdown.shutdown();
        }
    });

    let shutdown = gateway.shutdown_handle();
    let mut backoff = MIN_BACKOFF;
    while !shutdown.is_shutdown() {
        match gateway.run().await {
            Ok(summary) => {
                tracing::info!(
                    end = ?summary.end,
                    lines = summary.lines_received,
                    failed = summary.failed_deliveries,
                    "session over"
                );
                if summary.end == SessionEnd::Shutdown {
                    break;
                }
                if summary.lines_received > 0 {
                    backoff = MIN_BACKOFF;
                }
            }
            Err(e) => tracing::warn!(error = %e, "session failed"),
        }

        tracing::info!(delay_secs = backoff.as_secs(), "reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown.wait() => break,
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    Ok(())
}
