// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `api` module contains the traits and types the controller uses to talk to a Bluetooth
//! radio. A [`Transport`] is the central side (adapter power state, scanning, events) and a
//! [`Peripheral`] is a single discovered bulb.
//!
//! Implementations live in [`platform`](crate::platform); tests use an in-memory transport.

use async_trait::async_trait;
use bitflags::bitflags;
use futures::stream::Stream;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::pin::Pin;
use uuid::Uuid;

use crate::Result;

/// Power state of the host radio, as last reported by the transport.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", rename_all = "camelCase")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdapterState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    /// The state name reported in status updates.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterState::Unknown => "unknown",
            AdapterState::Resetting => "resetting",
            AdapterState::Unsupported => "unsupported",
            AdapterState::Unauthorized => "unauthorized",
            AdapterState::PoweredOff => "poweredOff",
            AdapterState::PoweredOn => "poweredOn",
        }
    }

    pub fn is_powered_on(&self) -> bool {
        *self == AdapterState::PoweredOn
    }
}

impl Display for AdapterState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of properties that indicate what operations are supported by a Characteristic.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct CharPropFlags: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

impl CharPropFlags {
    /// Whether the characteristic accepts writes of either kind.
    pub fn is_writable(&self) -> bool {
        self.intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE)
    }
}

/// A GATT service on a connected peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Service {
    pub uuid: Uuid,
    pub primary: bool,
}

/// A Bluetooth characteristic. Characteristics are the main way you will interact with other
/// bluetooth devices. Characteristics are identified by a UUID which may be standardized
/// (like 0x2803, which identifies a characteristic for reading heart rate measurements) but more
/// often are specific to a particular device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Characteristic {
    pub uuid: Uuid,
    /// The UUID of the service this characteristic belongs to.
    pub service_uuid: Uuid,
    pub properties: CharPropFlags,
}

/// The type of write operation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    /// A write operation where the device is expected to respond with a confirmation or error.
    WithResponse,
    /// A write-without-response, also known as a command.
    WithoutResponse,
}

/// Options passed to [`Transport::start_scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Only report peripherals advertising at least one of these services. Empty means all.
    pub services: Vec<Uuid>,
    /// Report every advertisement instead of one per peripheral.
    pub allow_duplicates: bool,
}

/// Advertisement data of a discovered peripheral.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeripheralProperties {
    pub local_name: Option<String>,
    pub rssi: Option<i16>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub services: Vec<Uuid>,
}

/// Opaque, transport assigned identity of a peripheral.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralId(String);

impl From<String> for PeripheralId {
    fn from(id: String) -> Self {
        PeripheralId(id)
    }
}

impl From<&str> for PeripheralId {
    fn from(id: &str) -> Self {
        PeripheralId(id.to_owned())
    }
}

impl Display for PeripheralId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Events produced by a [`Transport`] once its event stream has been taken.
#[derive(Debug, Clone)]
pub enum TransportEvent<P> {
    /// The adapter moved to a new power state.
    StateChanged(AdapterState),
    /// An advertisement was received while scanning.
    PeripheralDiscovered(P),
    PeripheralDisconnected(PeripheralId),
}

pub type EventStream<P> = Pin<Box<dyn Stream<Item = TransportEvent<P>> + Send>>;

/// Transport is the central side of BLE: it owns the radio, scans, and reports what it sees.
#[async_trait]
pub trait Transport: Send + Sync + Clone + 'static {
    type Peripheral: Peripheral;

    /// Retrieve a stream of [`TransportEvent`]s covering adapter power changes and peripheral
    /// discovery.
    async fn events(&self) -> Result<EventStream<Self::Peripheral>>;

    /// The current adapter power state.
    async fn adapter_state(&self) -> Result<AdapterState>;

    /// Starts a scan for BLE devices. Discovered devices are announced on the event stream.
    async fn start_scan(&self, filter: ScanFilter) -> Result<()>;

    /// Stops scanning for BLE devices.
    async fn stop_scan(&self) -> Result<()>;
}

/// Peripheral is the device that you would like to communicate with (the "server" of BLE).
#[async_trait]
pub trait Peripheral: Send + Sync + Clone + Debug + 'static {
    fn id(&self) -> PeripheralId;

    /// Returns the advertised properties of the peripheral, if any have been received.
    async fn properties(&self) -> Result<Option<PeripheralProperties>>;

    /// Creates a connection to the device.
    async fn connect(&self) -> Result<()>;

    /// Discovers the services with the given UUIDs. Services the device does not expose are
    /// absent from the result.
    async fn discover_services(&self, uuids: &[Uuid]) -> Result<Vec<Service>>;

    /// Discovers the given characteristics of `service` in one request.
    async fn discover_characteristics(
        &self,
        service: &Service,
        uuids: &[Uuid],
    ) -> Result<Vec<Characteristic>>;

    /// Write some data to the characteristic. Returns an error if the write couldn't be sent or (in
    /// the case of a write-with-response) if the device returns an error.
    async fn write(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()>;
}
