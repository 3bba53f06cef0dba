//! Ferry demo server.
//!
//! Serves a small hello application. Run locally it listens on
//! `FERRY_ADDR`; deployed as a serverless function it answers proxy
//! integration events instead.
//!
//! # Usage
//!
//! ```text
//! FERRY_ADDR=127.0.0.1:8080 FERRY_PREFIX=/api ferry-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FERRY_ADDR` | `0.0.0.0:8080` | Bind address |
//! | `FERRY_PREFIX` | `/` | Mount prefix |
//! | `FERRY_PAYLOAD_VERSION` | *(auto-detect)* | Force the envelope variant |
//! | `FERRY_PROXY_PROTOCOL` | `false` | Accept PROXY protocol preambles |
//! | `FERRY_STREAMING_RESPONSE` | `false` | Stream responses in handler mode |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod app;

use anyhow::{Context, Result};
use ferry_core::FerryConfig;
use ferry_runtime::Ferry;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = FerryConfig::from_env();
    init_tracing(&config.log_level)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        prefix = %config.prefix,
        "starting ferry-server"
    );

    Ferry::new(config, app::hello_app())
        .with_term_handler(|| info!("termination requested, finishing in-flight requests"))
        .run()
        .await
        .context("ferry-server stopped with an error")?;

    info!("shutdown complete");
    Ok(())
}
