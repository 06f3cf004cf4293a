// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Scan lifecycle: starts and stops scanning as the adapter powers on and off.
//!
//! Transitions return the [`StatusUpdate`] they produce instead of sending it, so the owner decides
//! where status goes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;

use log::{debug, error, info, warn};

use crate::api::{AdapterState, ScanFilter, Transport};
use crate::constants::short_uuid;
use uuid::Uuid;

/// Whether a scan is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Stopped,
    Scanning,
}

/// Status message emitted on every scan start/stop and once when the adapter is not ready at
/// startup.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", rename_all = "camelCase")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status_update: bool,
    pub error: bool,
    /// True when the transition was caused by an adapter state change.
    pub state_change: bool,
    pub state: AdapterState,
}

impl StatusUpdate {
    pub fn new(error: bool, state_change: bool, state: AdapterState) -> Self {
        StatusUpdate {
            status_update: true,
            error,
            state_change,
            state,
        }
    }
}

/// Outcome of [`ScanLifecycle::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// The adapter was powered on and scanning began.
    Started(Option<StatusUpdate>),
    /// The adapter was not ready. The update is to be reported once, after the warning delay.
    Deferred(StatusUpdate),
}

#[derive(Debug)]
pub struct ScanLifecycle<T> {
    transport: T,
    filter: ScanFilter,
    state: ScanState,
    adapter_state: AdapterState,
}

impl<T: Transport> ScanLifecycle<T> {
    pub fn new(transport: T, filter: ScanFilter) -> Self {
        ScanLifecycle {
            transport,
            filter,
            state: ScanState::Stopped,
            adapter_state: AdapterState::Unknown,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Last adapter state seen by the lifecycle.
    pub fn adapter_state(&self) -> AdapterState {
        self.adapter_state
    }

    /// Reads the adapter state and starts scanning right away if it is powered on.
    pub async fn initialize(&mut self) -> Startup {
        self.adapter_state = match self.transport.adapter_state().await {
            Ok(state) => state,
            Err(e) => {
                error!("Reading adapter state failed: {}", e);
                AdapterState::Unknown
            }
        };
        if self.adapter_state.is_powered_on() {
            Startup::Started(self.start(false).await)
        } else {
            warn!(
                "Unable to start BLE scan. Adapter state: {}",
                self.adapter_state
            );
            Startup::Deferred(StatusUpdate::new(true, false, self.adapter_state))
        }
    }

    /// Handles an adapter power state change reported by the transport.
    pub async fn on_adapter_state(&mut self, state: AdapterState) -> Option<StatusUpdate> {
        debug!("Adapter state changed to {}", state);
        self.adapter_state = state;
        if state.is_powered_on() {
            self.start(true).await
        } else {
            self.stop(true, true).await
        }
    }

    /// Starts scanning. No-op while already scanning or while the adapter is not powered on.
    pub async fn start(&mut self, state_change: bool) -> Option<StatusUpdate> {
        if self.state == ScanState::Scanning {
            return None;
        }
        if !self.adapter_state.is_powered_on() {
            debug!("Not scanning, adapter is {}", self.adapter_state);
            return None;
        }
        self.state = ScanState::Scanning;
        let status = StatusUpdate::new(false, state_change, self.adapter_state);
        if let Err(e) = self.transport.start_scan(self.filter.clone()).await {
            error!("Starting scan failed: {}", e);
        }
        info!(
            "Scanning for BLEs started. Service: {} - Duplicates allowed: {}",
            service_list(&self.filter.services),
            self.filter.allow_duplicates
        );
        Some(status)
    }

    /// Stops scanning. No-op while already stopped.
    pub async fn stop(&mut self, state_change: bool, error: bool) -> Option<StatusUpdate> {
        if self.state == ScanState::Stopped {
            return None;
        }
        self.state = ScanState::Stopped;
        let status = StatusUpdate::new(error, state_change, self.adapter_state);
        if let Err(e) = self.transport.stop_scan().await {
            error!("Stopping scan failed: {}", e);
        }
        if error {
            warn!("BLE scanning stopped due to change in adapter state.");
        } else {
            info!("BLE scanning stopped.");
        }
        Some(status)
    }

    /// Explicit shutdown.
    pub async fn close(&mut self) -> Option<StatusUpdate> {
        self.stop(false, false).await
    }
}

/// Renders services the way the bulbs advertise them, `fff0` rather than the full UUID.
fn service_list(services: &[Uuid]) -> String {
    services
        .iter()
        .map(|uuid| match short_uuid(uuid) {
            Some(short) => format!("{:04x}", short),
            None => uuid.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
