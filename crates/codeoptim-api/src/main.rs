use codeoptim_api::Server;
use codeoptim_core::ConfigManager;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> codeoptim_core::Result<()> {
    // Loaded before the subscriber exists: it picks the log format.
    let config = Arc::new(ConfigManager::load()?);

    let level = &config.config().logging.level;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "codeoptim_api=debug,codeoptim_ai={level},codeoptim_services={level},tower_http=debug"
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match config.config().logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        "compact" => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        "Captain: {}, Morph: {}, sandbox: {}",
        configured(config.config().captain.api_key.is_some()),
        configured(config.config().morph.api_key.is_some()),
        if config.config().sandbox.enabled { "enabled" } else { "simulated" }
    );

    let server = Server::new(config).await?;
    server.run().await
}

fn configured(present: bool) -> &'static str {
    if present {
        "configured"
    } else {
        "fallback"
    }
}
