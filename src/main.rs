use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use zone_quest::config::ServerConfig;
use zone_quest::script::HotReloadEvent;
use zone_quest::zone::{ZoneInstance, ZoneManager};

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

/// Log reload events for one zone and drop state left by removed scripts
fn start_hot_reload(instance: Arc<ZoneInstance>) {
    let zone = instance.info().short_name.clone();
    match instance.watch_scripts() {
        Ok(Some(mut rx)) => {
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        HotReloadEvent::Reloaded(script_id) => {
                            info!("Script hot-reload in {}: {}", zone, script_id);
                        }
                        HotReloadEvent::Removed(script_id) => {
                            instance.forget_script(&script_id);
                            info!("Script removed from {}: {}", zone, script_id);
                        }
                        HotReloadEvent::Error(e) => {
                            error!("Script hot-reload error in {}: {}", zone, e);
                        }
                    }
                }
            });
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to start script hot-reload for {}: {}", zone, e);
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zone_quest=info")),
        )
        .init();

    let config_path = std::env::var("ZONE_QUEST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match ServerConfig::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let manager = Arc::new(ZoneManager::new(config.event_pool_size));
    for zone_config in &config.zones {
        let (instance, _) = manager.boot(zone_config);
        if config.hot_reload {
            start_hot_reload(instance);
        }
    }
    info!("Zone quest server running with {} zone instance(s)", manager.len());

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_rate_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                manager.tick_all();
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    for instance in manager.instances() {
        let info = instance.info();
        manager.shutdown(info.zone_id, info.instance_id);
    }
}
