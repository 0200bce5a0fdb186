use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use super::instance::{TickSummary, ZoneInstance};
use crate::config::ZoneConfig;

/// Running zone instances keyed by (zone id, instance id)
pub struct ZoneManager {
    instances: DashMap<(u32, u32), Arc<ZoneInstance>>,
    event_pool_size: usize,
}

impl ZoneManager {
    pub fn new(event_pool_size: usize) -> Self {
        Self {
            instances: DashMap::new(),
            event_pool_size,
        }
    }

    /// Boot a zone instance: load its scripts and populate its spawn points.
    /// Returns the existing instance if it is already running.
    pub fn boot(&self, config: &ZoneConfig) -> (Arc<ZoneInstance>, bool) {
        let key = (config.zone_id, config.instance_id);
        if let Some(instance) = self.instances.get(&key) {
            return (instance.clone(), false);
        }

        let instance = Arc::new(ZoneInstance::new(config, self.event_pool_size));
        if let Err(e) = instance.load_scripts() {
            warn!("Failed to load scripts for {}: {}", config.short_name, e);
        }
        instance.spawn_all();

        self.instances.insert(key, instance.clone());
        info!(
            "Booted zone {} ({}) instance {}",
            config.display_name(),
            config.zone_id,
            config.instance_id
        );
        (instance, true)
    }

    pub fn get(&self, zone_id: u32, instance_id: u32) -> Option<Arc<ZoneInstance>> {
        self.instances
            .get(&(zone_id, instance_id))
            .map(|entry| entry.value().clone())
    }

    /// Shut an instance down, letting remaining players leave first
    pub fn shutdown(&self, zone_id: u32, instance_id: u32) -> Option<Arc<ZoneInstance>> {
        let (_, instance) = self.instances.remove(&(zone_id, instance_id))?;
        for player_id in instance.player_ids() {
            instance.player_leave(player_id);
        }
        info!("Shut down zone {} instance {}", zone_id, instance_id);
        Some(instance)
    }

    pub fn instances(&self) -> Vec<Arc<ZoneInstance>> {
        self.instances.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Tick every instance
    pub fn tick_all(&self) -> TickSummary {
        let mut total = TickSummary::default();
        for instance in self.instances() {
            let summary = instance.tick();
            total.respawned += summary.respawned;
            total.timers_fired += summary.timers_fired;
        }
        total
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
