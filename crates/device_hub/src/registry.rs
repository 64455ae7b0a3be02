//! Connection registry: one live device per connection identifier

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{Config, CONFIG};
use crate::device::Device;
use crate::error::{DeviceError, Result};
use crate::platform::{ConnectionId, Platform};

/// Maps connection identifiers to connected devices.
///
/// Create one per process (or per test) and share it by reference.
pub struct Registry {
    config: Config,
    devices: RwLock<HashMap<ConnectionId, Arc<Device>>>,
}

impl Registry {
    /// Registry using the environment configuration
    pub fn new() -> Self {
        Self::with_config(CONFIG.clone())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            devices: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect to `address` on the platform tagged `platform`.
    ///
    /// Connecting an identifier that is already connected returns it as is.
    pub async fn connect(&self, platform: &str, address: &str) -> Result<ConnectionId> {
        let platform: Platform = platform.parse()?;
        self.connect_platform(platform, address).await
    }

    pub async fn connect_platform(&self, platform: Platform, address: &str) -> Result<ConnectionId> {
        let id = ConnectionId::new(platform, address);
        if self.devices.read().await.contains_key(&id) {
            debug!("{} already connected", id);
            return Ok(id);
        }

        // the handshake may block for a while; keep the map unlocked meanwhile
        let device = Arc::new(Device::open(platform, address, &self.config).await?);

        let loser = {
            let mut devices = self.devices.write().await;
            if devices.contains_key(&id) {
                Some(device)
            } else {
                devices.insert(id.clone(), device);
                None
            }
        };

        match loser {
            Some(device) => {
                debug!("{} was connected concurrently, dropping duplicate", id);
                if let Err(e) = device.close().await {
                    warn!("closing duplicate connection {} failed: {}", id, e);
                }
            }
            None => info!("connected {}", id),
        }

        Ok(id)
    }

    /// Replace any existing connection for (`platform`, `address`) with a fresh one
    pub async fn reconnect(&self, platform: &str, address: &str) -> Result<ConnectionId> {
        let platform: Platform = platform.parse()?;
        let id = ConnectionId::new(platform, address);
        let device = Arc::new(Device::open(platform, address, &self.config).await?);

        let previous = self.devices.write().await.insert(id.clone(), device);
        if let Some(previous) = previous {
            if let Err(e) = previous.close().await {
                warn!("closing replaced connection {} failed: {}", id, e);
            }
        }

        info!("reconnected {}", id);
        Ok(id)
    }

    /// Look up a device, connecting lazily when the identifier is unknown
    pub async fn get(&self, id: &str) -> Result<Arc<Device>> {
        if let Some(device) = self.devices.read().await.get(id) {
            return Ok(Arc::clone(device));
        }

        let (platform, address) = ConnectionId::parse(id)?;
        let id = self.connect_platform(platform, &address).await?;

        self.devices
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DeviceError::Connection(format!("{} was released while connecting", id)))
    }

    /// Remove a device and release its backend session.
    ///
    /// Returns whether the identifier was connected.
    pub async fn disconnect(&self, id: &str) -> Result<bool> {
        let removed = self.devices.write().await.remove(id);
        match removed {
            Some(device) => {
                device.close().await?;
                info!("disconnected {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Release every connection
    pub async fn close_all(&self) {
        let drained: Vec<(ConnectionId, Arc<Device>)> =
            self.devices.write().await.drain().collect();

        let results = join_all(drained.iter().map(|(_, device)| device.close())).await;
        for ((id, _), result) in drained.iter().zip(results) {
            if let Err(e) = result {
                warn!("closing {} failed: {}", id, e);
            }
        }
    }

    /// Identifiers currently connected, sorted
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.devices.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
