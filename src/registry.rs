// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Characteristics resolved on connected bulbs, keyed by peripheral and role.

use dashmap::DashMap;
use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::api::{Characteristic, Peripheral, PeripheralId};
use crate::constants::Role;

/// A characteristic resolved on a connected peripheral, together with the handle used to write
/// to it.
#[derive(Debug, Clone)]
pub struct DiscoveredCharacteristic<P> {
    pub peripheral: P,
    pub role: Role,
    pub characteristic: Characteristic,
}

#[derive(Debug)]
struct Entry<P> {
    sequence: u64,
    discovered: DiscoveredCharacteristic<P>,
}

/// Per-controller store of discovered characteristics.
///
/// Written by the acquisition pipeline, read by the command path. Cloning is cheap and shares
/// the same underlying map.
#[derive(Debug)]
pub struct DeviceRegistry<P> {
    entries: Arc<DashMap<(PeripheralId, Role), Entry<P>>>,
    sequence: Arc<AtomicU64>,
}

impl<P> Clone for DeviceRegistry<P> {
    fn clone(&self) -> Self {
        DeviceRegistry {
            entries: self.entries.clone(),
            sequence: self.sequence.clone(),
        }
    }
}

impl<P> Default for DeviceRegistry<P> {
    fn default() -> Self {
        DeviceRegistry {
            entries: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<P: Peripheral> DeviceRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `characteristic`, replacing any earlier entry for the same peripheral and role.
    pub fn insert(&self, discovered: DiscoveredCharacteristic<P>) {
        let key = (discovered.peripheral.id(), discovered.role);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        trace!("Registering {} on {}", key.1, key.0);
        self.entries.insert(
            key,
            Entry {
                sequence,
                discovered,
            },
        );
    }

    /// The most recently discovered characteristic for `role` on any peripheral.
    pub fn lookup(&self, role: Role) -> Option<DiscoveredCharacteristic<P>> {
        self.entries
            .iter()
            .filter(|entry| entry.key().1 == role)
            .max_by_key(|entry| entry.value().sequence)
            .map(|entry| entry.value().discovered.clone())
    }

    /// The characteristic for `role` on one particular peripheral.
    pub fn lookup_for(&self, id: &PeripheralId, role: Role) -> Option<DiscoveredCharacteristic<P>> {
        self.entries
            .get(&(id.clone(), role))
            .map(|entry| entry.value().discovered.clone())
    }

    /// Forgets every characteristic of `id`. Returns how many entries were dropped.
    pub fn remove_peripheral(&self, id: &PeripheralId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(peripheral, _), _| peripheral != id);
        before - self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Roles registered for `id`, in role order.
    pub fn roles_for(&self, id: &PeripheralId) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .entries
            .iter()
            .filter(|entry| entry.key().0 == *id)
            .map(|entry| entry.key().1)
            .collect();
        roles.sort();
        roles
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A handle onto the same entries that can only read them.
    pub fn view(&self) -> RegistryView<P> {
        RegistryView {
            registry: self.clone(),
        }
    }
}

/// Read-only access to a [`DeviceRegistry`], handed out to callers outside the controller.
#[derive(Debug)]
pub struct RegistryView<P> {
    registry: DeviceRegistry<P>,
}

impl<P> Clone for RegistryView<P> {
    fn clone(&self) -> Self {
        RegistryView {
            registry: self.registry.clone(),
        }
    }
}

impl<P: Peripheral> RegistryView<P> {
    pub fn lookup(&self, role: Role) -> Option<DiscoveredCharacteristic<P>> {
        self.registry.lookup(role)
    }

    pub fn lookup_for(&self, id: &PeripheralId, role: Role) -> Option<DiscoveredCharacteristic<P>> {
        self.registry.lookup_for(id, role)
    }

    pub fn roles_for(&self, id: &PeripheralId) -> Vec<Role> {
        self.registry.roles_for(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
