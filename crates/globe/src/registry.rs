use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::instance::{GlobeInstance, InstanceHandle};

/// Container id to globe instance map.
///
/// Instances are created lazily and share nothing with each other. Removing
/// an entry disposes the instance first.
pub struct InstanceRegistry {
    instances: RwLock<HashMap<String, InstanceHandle>>,
    camera_animation: Duration,
    event_capacity: usize,
}

impl InstanceRegistry {
    pub fn new(camera_animation: Duration, event_capacity: usize) -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            camera_animation,
            event_capacity,
        }
    }

    pub fn get_or_create(&self, container_id: &str) -> InstanceHandle {
        if let Some(handle) = self.get(container_id) {
            return handle;
        }
        let mut instances = self.instances.write();
        instances
            .entry(container_id.to_string())
            .or_insert_with(|| {
                debug!(%container_id, "creating globe instance");
                GlobeInstance::new(container_id, self.camera_animation, self.event_capacity)
                    .handle()
            })
            .clone()
    }

    pub fn get(&self, container_id: &str) -> Option<InstanceHandle> {
        self.instances.read().get(container_id).cloned()
    }

    pub fn exists(&self, container_id: &str) -> bool {
        self.instances.read().contains_key(container_id)
    }

    /// Disposes and forgets `container_id`. Unknown ids are a no-op.
    pub fn remove(&self, container_id: &str) -> bool {
        let removed = self.instances.write().remove(container_id);
        match removed {
            Some(handle) => {
                handle.lock().dispose();
                true
            }
            None => false,
        }
    }

    /// Sorted for stable output.
    pub fn container_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.instances.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispose_all(&self) {
        let drained: Vec<InstanceHandle> = self.instances.write().drain().map(|(_, h)| h).collect();
        for handle in drained {
            handle.lock().dispose();
        }
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), runtime::event_bus::DEFAULT_EVENT_CAPACITY)
    }
}
