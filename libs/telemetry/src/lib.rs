//! Lightweight telemetry installation.
//!
//! Installs a `tracing` subscriber configured from `RUST_LOG`, with an
//! optional JSON formatter for log shippers (`JSON_LOGS=1`). Safe to call
//! more than once; only the first call installs.

use std::sync::OnceLock;

use anyhow::Result;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the shared tracing subscriber for `service_name`.
pub fn install(service_name: &str) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let json_logs = std::env::var("JSON_LOGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();

    tracing::debug!(service = service_name, "telemetry installed");
    INIT.set(()).ok();
    Ok(())
}
