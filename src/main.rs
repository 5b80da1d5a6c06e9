//! Rug Sage server.
//!
//! Entry point for the chat application.

use std::sync::Arc;

use mimalloc::MiMalloc;
use rug_sage::{config, server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = match config::AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init(config.logging.json);

    let settings = config::load_llm_settings(&config)?;

    server::start_server(Arc::new(config), settings).await
}
