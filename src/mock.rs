//! In-memory transport used by the unit tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::api::{
    AdapterState, CharPropFlags, Characteristic, EventStream, Peripheral, PeripheralId,
    PeripheralProperties, ScanFilter, Service, Transport, TransportEvent, WriteType,
};
use crate::constants::{Role, SERVICE_UUID};
use crate::{Error, Result};

pub fn characteristic(uuid: Uuid) -> Characteristic {
    Characteristic {
        uuid,
        service_uuid: SERVICE_UUID,
        properties: CharPropFlags::READ | CharPropFlags::WRITE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub uuid: Uuid,
    pub data: Vec<u8>,
    pub write_type: WriteType,
}

#[derive(Debug, Default)]
struct PeripheralState {
    connects: usize,
    fail_connect: bool,
    hide_service: bool,
    service_failures: usize,
    exposed: Option<Vec<Role>>,
    service_requests: Vec<Vec<Uuid>>,
    characteristic_requests: Vec<Vec<Uuid>>,
    writes: Vec<WriteRecord>,
    writes_allowed: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct MockPeripheral {
    id: PeripheralId,
    local_name: Option<String>,
    state: Arc<Mutex<PeripheralState>>,
}

impl MockPeripheral {
    pub fn new(id: &str, local_name: Option<&str>) -> Self {
        MockPeripheral {
            id: id.into(),
            local_name: local_name.map(str::to_owned),
            state: Arc::new(Mutex::new(PeripheralState::default())),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PeripheralState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn fail_connect(&self) {
        self.with_state(|s| s.fail_connect = true)
    }

    pub fn hide_service(&self) {
        self.with_state(|s| s.hide_service = true)
    }

    pub fn fail_service_discovery_times(&self, times: usize) {
        self.with_state(|s| s.service_failures = times)
    }

    pub fn expose_only(&self, roles: &[Role]) {
        self.with_state(|s| s.exposed = Some(roles.to_vec()))
    }

    /// Lets `count` writes succeed, then fails every following write.
    pub fn fail_writes_after(&self, count: usize) {
        self.with_state(|s| s.writes_allowed = Some(count))
    }

    pub fn connects(&self) -> usize {
        self.with_state(|s| s.connects)
    }

    pub fn service_requests(&self) -> Vec<Vec<Uuid>> {
        self.with_state(|s| s.service_requests.clone())
    }

    pub fn characteristic_requests(&self) -> Vec<Vec<Uuid>> {
        self.with_state(|s| s.characteristic_requests.clone())
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.with_state(|s| s.writes.clone())
    }
}

#[async_trait]
impl Peripheral for MockPeripheral {
    fn id(&self) -> PeripheralId {
        self.id.clone()
    }

    async fn properties(&self) -> Result<Option<PeripheralProperties>> {
        Ok(Some(PeripheralProperties {
            local_name: self.local_name.clone(),
            services: vec![SERVICE_UUID],
            ..Default::default()
        }))
    }

    async fn connect(&self) -> Result<()> {
        self.with_state(|s| {
            s.connects += 1;
            if s.fail_connect {
                Err(Error::Other("connection refused".into()))
            } else {
                Ok(())
            }
        })
    }

    async fn discover_services(&self, uuids: &[Uuid]) -> Result<Vec<Service>> {
        self.with_state(|s| {
            s.service_requests.push(uuids.to_vec());
            if s.service_failures > 0 {
                s.service_failures -= 1;
                return Err(Error::NotConnected);
            }
            if s.hide_service || !uuids.contains(&SERVICE_UUID) {
                return Ok(vec![]);
            }
            Ok(vec![Service {
                uuid: SERVICE_UUID,
                primary: true,
            }])
        })
    }

    async fn discover_characteristics(
        &self,
        service: &Service,
        uuids: &[Uuid],
    ) -> Result<Vec<Characteristic>> {
        self.with_state(|s| {
            s.characteristic_requests.push(uuids.to_vec());
            let exposed = s.exposed.clone().unwrap_or_else(|| Role::ALL.to_vec());
            Ok(exposed
                .into_iter()
                .map(|role| role.uuid())
                .filter(|uuid| uuids.contains(uuid))
                .map(|uuid| Characteristic {
                    service_uuid: service.uuid,
                    ..characteristic(uuid)
                })
                .collect())
        })
    }

    async fn write(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        self.with_state(|s| {
            if let Some(allowed) = s.writes_allowed {
                if s.writes.len() >= allowed {
                    return Err(Error::Other("write rejected".into()));
                }
            }
            s.writes.push(WriteRecord {
                uuid: characteristic.uuid,
                data: data.to_vec(),
                write_type,
            });
            Ok(())
        })
    }
}

#[derive(Debug)]
struct TransportState {
    adapter_state: AdapterState,
    scan_starts: usize,
    scan_stops: usize,
    fail_scans: bool,
    filters: Vec<ScanFilter>,
    receiver: Option<UnboundedReceiver<TransportEvent<MockPeripheral>>>,
}

#[derive(Debug, Clone)]
pub struct MockTransport {
    sender: UnboundedSender<TransportEvent<MockPeripheral>>,
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn new(adapter_state: AdapterState) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        MockTransport {
            sender,
            state: Arc::new(Mutex::new(TransportState {
                adapter_state,
                scan_starts: 0,
                scan_stops: 0,
                fail_scans: false,
                filters: Vec::new(),
                receiver: Some(receiver),
            })),
        }
    }

    /// Changes the adapter state and reports it on the event stream.
    pub fn set_state(&self, adapter_state: AdapterState) {
        self.state.lock().unwrap().adapter_state = adapter_state;
        self.emit(TransportEvent::StateChanged(adapter_state));
    }

    pub fn discover(&self, peripheral: &MockPeripheral) {
        self.emit(TransportEvent::PeripheralDiscovered(peripheral.clone()));
    }

    pub fn disconnect(&self, peripheral: &MockPeripheral) {
        self.emit(TransportEvent::PeripheralDisconnected(peripheral.id()));
    }

    pub fn emit(&self, event: TransportEvent<MockPeripheral>) {
        let _ = self.sender.send(event);
    }

    pub fn fail_scans(&self) {
        self.state.lock().unwrap().fail_scans = true;
    }

    pub fn scan_starts(&self) -> usize {
        self.state.lock().unwrap().scan_starts
    }

    pub fn scan_stops(&self) -> usize {
        self.state.lock().unwrap().scan_stops
    }

    pub fn filters(&self) -> Vec<ScanFilter> {
        self.state.lock().unwrap().filters.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Peripheral = MockPeripheral;

    async fn events(&self) -> Result<EventStream<MockPeripheral>> {
        let receiver = self
            .state
            .lock()
            .unwrap()
            .receiver
            .take()
            .ok_or_else(|| Error::Other("event stream already taken".into()))?;
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }

    async fn adapter_state(&self) -> Result<AdapterState> {
        Ok(self.state.lock().unwrap().adapter_state)
    }

    async fn start_scan(&self, filter: ScanFilter) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.scan_starts += 1;
        state.filters.push(filter);
        if state.fail_scans {
            return Err(Error::Other("scan refused".into()));
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.scan_stops += 1;
        if state.fail_scans {
            return Err(Error::Other("scan refused".into()));
        }
        Ok(())
    }
}
