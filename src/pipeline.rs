// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Peripheral acquisition: name filter, settle delay, connect, service and characteristic
//! discovery, registration.
//!
//! Failures are logged and never retried beyond [`ControllerConfig::retries`]. Whatever was
//! registered before a failure stays registered.

use dashmap::DashSet;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::{Peripheral, PeripheralId, PeripheralProperties};
use crate::common::util::retry;
use crate::config::ControllerConfig;
use crate::constants::{Role, SERVICE_UUID};
use crate::registry::{DeviceRegistry, DiscoveredCharacteristic};
use crate::{Error, Result};

/// Whether an advertisement belongs to a bulb we drive. The name must match exactly.
pub fn is_target(properties: Option<&PeripheralProperties>, local_name: &str) -> bool {
    properties
        .and_then(|properties| properties.local_name.as_deref())
        .map_or(false, |name| name == local_name)
}

/// Connects to `peripheral` and registers its vendor characteristics. Returns how many were
/// registered.
///
/// A failed connect is logged and discovery is attempted anyway; the transport reports the real
/// problem on the next step.
pub async fn acquire<P: Peripheral>(
    peripheral: &P,
    registry: &DeviceRegistry<P>,
    config: &ControllerConfig,
) -> Result<usize> {
    let id = peripheral.id();
    tokio::time::sleep(config.settle_delay).await;

    if let Err(e) = retry("connect", config.retries, config.retry_delay, || {
        peripheral.connect()
    })
    .await
    {
        error!("{}", Error::ConnectFailed(format!("{}: {}", id, e)));
    }

    let services = retry(
        "service discovery",
        config.retries,
        config.retry_delay,
        || peripheral.discover_services(&[SERVICE_UUID]),
    )
    .await
    .map_err(|e| Error::ServiceDiscoveryFailed(format!("{}: {}", id, e)))?;
    let service = services
        .into_iter()
        .next()
        .ok_or_else(|| Error::ServiceDiscoveryFailed(format!("{}: no vendor service", id)))?;

    let uuids = Role::all_uuids();
    let characteristics = retry(
        "characteristic discovery",
        config.retries,
        config.retry_delay,
        || peripheral.discover_characteristics(&service, &uuids),
    )
    .await
    .map_err(|e| Error::CharacteristicDiscoveryFailed(format!("{}: {}", id, e)))?;

    let mut registered = 0;
    for characteristic in characteristics {
        match Role::from_uuid(&characteristic.uuid) {
            Some(role) => {
                registry.insert(DiscoveredCharacteristic {
                    peripheral: peripheral.clone(),
                    role,
                    characteristic,
                });
                registered += 1;
            }
            None => debug!("Ignoring unknown characteristic {} on {}", characteristic.uuid, id),
        }
    }
    info!("Registered {} characteristics of {}", registered, id);
    Ok(registered)
}

/// Runs acquisitions for discovered peripherals in the background, at most one per peripheral
/// at a time.
#[derive(Debug)]
pub struct AcquisitionPipeline<P> {
    registry: DeviceRegistry<P>,
    config: Arc<ControllerConfig>,
    pending: Arc<DashSet<PeripheralId>>,
}

impl<P: Peripheral> AcquisitionPipeline<P> {
    pub fn new(registry: DeviceRegistry<P>, config: Arc<ControllerConfig>) -> Self {
        AcquisitionPipeline {
            registry,
            config,
            pending: Arc::new(DashSet::new()),
        }
    }

    /// Handles a discovery event. Returns the handle of the spawned acquisition, or `None` if the
    /// peripheral was filtered out, is already registered, or is being acquired.
    pub async fn on_discovered(&self, peripheral: P) -> Option<JoinHandle<()>> {
        let properties = match peripheral.properties().await {
            Ok(properties) => properties,
            Err(e) => {
                debug!("No properties for {}: {}", peripheral.id(), e);
                return None;
            }
        };
        if !is_target(properties.as_ref(), &self.config.local_name) {
            return None;
        }
        let id = peripheral.id();
        if !self.registry.roles_for(&id).is_empty() || !self.pending.insert(id.clone()) {
            debug!("{} already acquired or in progress", id);
            return None;
        }

        info!("Found {} ({}), connecting", self.config.local_name, id);
        let registry = self.registry.clone();
        let config = self.config.clone();
        let pending = self.pending.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = acquire(&peripheral, &registry, &config).await {
                error!("{}", e);
            }
            pending.remove(&id);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPeripheral;
    use std::time::Duration;

    fn pipeline() -> (DeviceRegistry<MockPeripheral>, AcquisitionPipeline<MockPeripheral>) {
        let registry = DeviceRegistry::new();
        let pipeline =
            AcquisitionPipeline::new(registry.clone(), Arc::new(ControllerConfig::default()));
        (registry, pipeline)
    }

    #[test]
    fn name_filter_is_exact() {
        let named = |name: &str| PeripheralProperties {
            local_name: Some(name.to_owned()),
            ..Default::default()
        };
        assert!(is_target(Some(&named("Yeelight Blue II")), "Yeelight Blue II"));
        assert!(!is_target(Some(&named("Yeelight Blue")), "Yeelight Blue II"));
        assert!(!is_target(Some(&named("yeelight blue ii")), "Yeelight Blue II"));
        assert!(!is_target(Some(&PeripheralProperties::default()), "Yeelight Blue II"));
        assert!(!is_target(None, "Yeelight Blue II"));
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_registers_all_roles_after_settle_delay() {
        let (registry, pipeline) = pipeline();
        let bulb = MockPeripheral::new("bulb", Some("Yeelight Blue II"));

        let handle = pipeline.on_discovered(bulb.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(bulb.connects(), 0);

        handle.await.unwrap();
        assert_eq!(bulb.connects(), 1);
        assert_eq!(bulb.service_requests(), vec![vec![SERVICE_UUID]]);
        assert_eq!(bulb.characteristic_requests(), vec![Role::all_uuids()]);
        assert_eq!(registry.roles_for(&bulb.id()), Role::ALL.to_vec());
        assert_eq!(registry.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn other_peripherals_are_ignored() {
        let (registry, pipeline) = pipeline();
        let other = MockPeripheral::new("other", Some("Mi Band"));
        let unnamed = MockPeripheral::new("unnamed", None);
        assert!(pipeline.on_discovered(other.clone()).await.is_none());
        assert!(pipeline.on_discovered(unnamed).await.is_none());
        assert_eq!(other.connects(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failure_does_not_abort_discovery() {
        let (registry, pipeline) = pipeline();
        let bulb = MockPeripheral::new("bulb", Some("Yeelight Blue II"));
        bulb.fail_connect();
        pipeline.on_discovered(bulb.clone()).await.unwrap().await.unwrap();
        assert_eq!(registry.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_service_leaves_registry_empty() {
        let registry = DeviceRegistry::new();
        let bulb = MockPeripheral::new("bulb", Some("Yeelight Blue II"));
        bulb.hide_service();
        let err = acquire(&bulb, &registry, &ControllerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceDiscoveryFailed(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn partial_characteristics_are_kept() {
        let registry = DeviceRegistry::new();
        let bulb = MockPeripheral::new("bulb", Some("Yeelight Blue II"));
        bulb.expose_only(&[Role::Control, Role::ColorFlow]);
        let count = acquire(&bulb, &registry, &ControllerConfig::default())
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert!(registry.lookup(Role::Control).is_some());
        assert!(registry.lookup(Role::Effect).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_discoveries_acquire_once() {
        let (_registry, pipeline) = pipeline();
        let bulb = MockPeripheral::new("bulb", Some("Yeelight Blue II"));
        let handle = pipeline.on_discovered(bulb.clone()).await.unwrap();
        assert!(pipeline.on_discovered(bulb.clone()).await.is_none());
        handle.await.unwrap();
        assert!(pipeline.on_discovered(bulb.clone()).await.is_none());
        assert_eq!(bulb.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_cover_flaky_discovery() {
        let registry = DeviceRegistry::new();
        let bulb = MockPeripheral::new("bulb", Some("Yeelight Blue II"));
        bulb.fail_service_discovery_times(1);
        let config = ControllerConfig {
            retries: 1,
            ..Default::default()
        };
        assert_eq!(acquire(&bulb, &registry, &config).await.unwrap(), 10);
        assert_eq!(bulb.service_requests().len(), 2);
    }
}
