use super::peripheral::Peripheral;
use crate::api::{AdapterState, EventStream, ScanFilter, Transport, TransportEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use bluez_async::{
    AdapterEvent, AdapterId, BluetoothEvent, BluetoothSession, DeviceEvent, DiscoveryFilter,
};
use futures::stream::{self, StreamExt};

/// Implementation of [api::Transport](crate::api::Transport) for one BlueZ adapter.
#[derive(Clone, Debug)]
pub struct Adapter {
    session: BluetoothSession,
    adapter: AdapterId,
}

impl Adapter {
    pub(crate) fn new(session: BluetoothSession, adapter: AdapterId) -> Self {
        Self { session, adapter }
    }

    /// Opens a D-Bus session and picks the first adapter BlueZ knows about.
    pub async fn default_adapter() -> Result<Self> {
        let (_, session) = BluetoothSession::new().await?;
        let adapters = session.get_adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable(AdapterState::Unsupported))?;
        Ok(Self::new(session, adapter.id))
    }
}

#[async_trait]
impl Transport for Adapter {
    type Peripheral = Peripheral;

    async fn events(&self) -> Result<EventStream<Peripheral>> {
        // Subscribe before listing devices so none slip between the two calls.
        let events = self.session.event_stream().await?;

        let devices = self.session.get_devices().await?;
        let session = self.session.clone();
        let initial_events = stream::iter(devices.into_iter().map(move |device| {
            TransportEvent::PeripheralDiscovered(Peripheral::new(session.clone(), device))
        }));

        let session = self.session.clone();
        let adapter = self.adapter.clone();
        let events = events.filter_map(move |event| {
            transport_event(event, session.clone(), adapter.clone())
        });

        Ok(Box::pin(initial_events.chain(events)))
    }

    async fn adapter_state(&self) -> Result<AdapterState> {
        let info = self.session.get_adapter_info(&self.adapter).await?;
        Ok(if info.powered {
            AdapterState::PoweredOn
        } else {
            AdapterState::PoweredOff
        })
    }

    async fn start_scan(&self, filter: ScanFilter) -> Result<()> {
        let filter = DiscoveryFilter {
            service_uuids: filter.services,
            duplicate_data: Some(filter.allow_duplicates),
            transport: Some(bluez_async::Transport::Le),
            ..Default::default()
        };
        self.session.start_discovery_with_filter(&filter).await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.session.stop_discovery().await?;
        Ok(())
    }
}

async fn transport_event(
    event: BluetoothEvent,
    session: BluetoothSession,
    adapter: AdapterId,
) -> Option<TransportEvent<Peripheral>> {
    match event {
        BluetoothEvent::Adapter {
            id,
            event: AdapterEvent::Powered { powered },
        } if id == adapter => Some(TransportEvent::StateChanged(if powered {
            AdapterState::PoweredOn
        } else {
            AdapterState::PoweredOff
        })),
        BluetoothEvent::Device {
            id,
            event: DeviceEvent::Discovered,
        } => {
            let device = session.get_device_info(&id).await.ok()?;
            Some(TransportEvent::PeripheralDiscovered(Peripheral::new(
                session, device,
            )))
        }
        BluetoothEvent::Device {
            id,
            event: DeviceEvent::Connected { connected: false },
        } => Some(TransportEvent::PeripheralDisconnected(id.into())),
        _ => None,
    }
}
