//! markerglobe: a spinning earth you can drop named markers on.
//!
//! Usage: markerglobe [config.yaml]
//!
//! `MARKERGLOBE_API_BASE` overrides the marker server address.

use anyhow::Context;
use markerglobe::config::GlobeConfig;
use validator::Validate;

const API_BASE_VAR: &str = "MARKERGLOBE_API_BASE";

fn load_config() -> anyhow::Result<GlobeConfig> {
    let mut config = match std::env::args_os().nth(1) {
        Some(path) => GlobeConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.to_string_lossy()))?,
        None => GlobeConfig::default(),
    };

    if let Ok(api_base) = std::env::var(API_BASE_VAR) {
        config.endpoints.api_base_url = api_base;
        config
            .validate()
            .with_context(|| format!("{API_BASE_VAR} is not a usable address"))?;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    markerglobe::init_tracing();

    let config = load_config()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting markerglobe");

    pollster::block_on(markerglobe::run_with_config(config))
}
