use async_trait::async_trait;
use bluez_async::{
    BluetoothSession, CharacteristicFlags, CharacteristicInfo, DeviceId, DeviceInfo, ServiceInfo,
    WriteOptions,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::api::{
    self, CharPropFlags, Characteristic, PeripheralId, PeripheralProperties, Service, WriteType,
};
use crate::{Error, Result};

#[derive(Clone, Debug)]
struct ServiceInternal {
    info: ServiceInfo,
    characteristics: HashMap<Uuid, CharacteristicInfo>,
}

/// Implementation of [api::Peripheral](crate::api::Peripheral).
#[derive(Clone, Debug)]
pub struct Peripheral {
    session: BluetoothSession,
    device: DeviceId,
    services: Arc<Mutex<HashMap<Uuid, ServiceInternal>>>,
}

impl Peripheral {
    pub(crate) fn new(session: BluetoothSession, device: DeviceInfo) -> Self {
        Peripheral {
            session,
            device: device.id,
            services: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn characteristic_info(&self, characteristic: &Characteristic) -> Result<CharacteristicInfo> {
        let services = self.services.lock().unwrap();
        services
            .get(&characteristic.service_uuid)
            .ok_or_else(|| {
                Error::Other(
                    format!(
                        "Service with UUID {} not found.",
                        characteristic.service_uuid
                    )
                    .into(),
                )
            })?
            .characteristics
            .get(&characteristic.uuid)
            .cloned()
            .ok_or_else(|| {
                Error::Other(
                    format!(
                        "Characteristic with UUID {} not found.",
                        characteristic.uuid
                    )
                    .into(),
                )
            })
    }

    fn service_info(&self, uuid: &Uuid) -> Option<ServiceInfo> {
        self.services
            .lock()
            .unwrap()
            .get(uuid)
            .map(|service| service.info.clone())
    }
}

#[async_trait]
impl api::Peripheral for Peripheral {
    fn id(&self) -> PeripheralId {
        self.device.clone().into()
    }

    async fn properties(&self) -> Result<Option<PeripheralProperties>> {
        let device_info = self.session.get_device_info(&self.device).await?;
        Ok(Some(PeripheralProperties {
            local_name: device_info.name,
            rssi: device_info.rssi,
            manufacturer_data: device_info.manufacturer_data,
            services: device_info.services,
        }))
    }

    async fn connect(&self) -> Result<()> {
        self.session.connect(&self.device).await?;
        Ok(())
    }

    async fn discover_services(&self, uuids: &[Uuid]) -> Result<Vec<Service>> {
        let found: Vec<ServiceInfo> = self
            .session
            .get_services(&self.device)
            .await?
            .into_iter()
            .filter(|service| uuids.contains(&service.uuid))
            .collect();
        let mut services = self.services.lock().unwrap();
        for info in &found {
            services.insert(
                info.uuid,
                ServiceInternal {
                    info: info.clone(),
                    characteristics: HashMap::new(),
                },
            );
        }
        Ok(found
            .into_iter()
            .map(|info| Service {
                uuid: info.uuid,
                primary: info.primary,
            })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        service: &Service,
        uuids: &[Uuid],
    ) -> Result<Vec<Characteristic>> {
        let info = self.service_info(&service.uuid).ok_or_else(|| {
            Error::Other(format!("Service with UUID {} not discovered.", service.uuid).into())
        })?;
        let found: Vec<CharacteristicInfo> = self
            .session
            .get_characteristics(&info.id)
            .await?
            .into_iter()
            .filter(|characteristic| uuids.contains(&characteristic.uuid))
            .collect();
        if let Some(internal) = self.services.lock().unwrap().get_mut(&service.uuid) {
            for characteristic in &found {
                internal
                    .characteristics
                    .insert(characteristic.uuid, characteristic.clone());
            }
        }
        Ok(found
            .into_iter()
            .map(|characteristic| Characteristic {
                uuid: characteristic.uuid,
                service_uuid: service.uuid,
                properties: characteristic.flags.into(),
            })
            .collect())
    }

    async fn write(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        let characteristic_info = self.characteristic_info(characteristic)?;
        let options = WriteOptions {
            write_type: Some(write_type.into()),
            ..Default::default()
        };
        Ok(self
            .session
            .write_characteristic_value_with_options(&characteristic_info.id, data, options)
            .await?)
    }
}

impl From<WriteType> for bluez_async::WriteType {
    fn from(write_type: WriteType) -> Self {
        match write_type {
            WriteType::WithoutResponse => bluez_async::WriteType::WithoutResponse,
            WriteType::WithResponse => bluez_async::WriteType::WithResponse,
        }
    }
}

impl From<DeviceId> for PeripheralId {
    fn from(device_id: DeviceId) -> Self {
        device_id.to_string().into()
    }
}

impl From<CharacteristicFlags> for CharPropFlags {
    fn from(flags: CharacteristicFlags) -> Self {
        [
            (CharacteristicFlags::BROADCAST, CharPropFlags::BROADCAST),
            (CharacteristicFlags::READ, CharPropFlags::READ),
            (
                CharacteristicFlags::WRITE_WITHOUT_RESPONSE,
                CharPropFlags::WRITE_WITHOUT_RESPONSE,
            ),
            (CharacteristicFlags::WRITE, CharPropFlags::WRITE),
            (CharacteristicFlags::NOTIFY, CharPropFlags::NOTIFY),
            (CharacteristicFlags::INDICATE, CharPropFlags::INDICATE),
            (
                CharacteristicFlags::SIGNED_WRITE,
                CharPropFlags::AUTHENTICATED_SIGNED_WRITES,
            ),
            (
                CharacteristicFlags::EXTENDED_PROPERTIES,
                CharPropFlags::EXTENDED_PROPERTIES,
            ),
        ]
        .into_iter()
        .filter(|(bluez, _)| flags.contains(*bluez))
        .fold(CharPropFlags::empty(), |result, (_, ours)| result | ours)
    }
}
