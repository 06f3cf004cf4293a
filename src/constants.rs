//! Identifiers and fixed values of the Yeelight Blue II protocol.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

/// Advertised local name of the supported bulb.
pub const DEVICE_NAME: &str = "Yeelight Blue II";

pub const SERVICE_UUID: Uuid = uuid_from_u16(0xfff0);
pub const CONTROL_UUID: Uuid = uuid_from_u16(0xfff1);
pub const DELAY_UUID: Uuid = uuid_from_u16(0xfff2);
pub const DELAY_QUERY_UUID: Uuid = uuid_from_u16(0xfff3);
pub const DELAY_RESPONSE_UUID: Uuid = uuid_from_u16(0xfff4);
pub const STATUS_QUERY_UUID: Uuid = uuid_from_u16(0xfff5);
pub const STATUS_RESPONSE_UUID: Uuid = uuid_from_u16(0xfff6);
pub const COLOR_FLOW_UUID: Uuid = uuid_from_u16(0xfff7);
pub const NAME_UUID: Uuid = uuid_from_u16(0xfff8);
pub const NAME_RESPONSE_UUID: Uuid = uuid_from_u16(0xfff9);
pub const EFFECT_UUID: Uuid = uuid_from_u16(0xfffc);

/// Wait between a discovery event and the connect attempt.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);
/// Delay of the one-shot status update sent when the adapter is not ready at startup.
pub const WARNING_DELAY: Duration = Duration::from_millis(3000);

/// Width of frames written to the control characteristic.
pub const CONTROL_FRAME_WIDTH: usize = 18;
/// Width of frames written to the color flow characteristic.
pub const COLOR_FLOW_FRAME_WIDTH: usize = 20;

const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;
const BLUETOOTH_BASE_MASK_16: u128 = 0xffff0000_ffff_ffff_ffff_ffffffffffff;

/// Expand a 16-bit short identifier into a full UUID on the Bluetooth base.
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// The 16-bit short form of `uuid`, if it sits on the Bluetooth base.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    if value & BLUETOOTH_BASE_MASK_16 == BLUETOOTH_BASE_UUID {
        Some((value >> 96) as u16)
    } else {
        None
    }
}

/// The function of one of the vendor characteristics.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", rename_all = "camelCase")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Control,
    DelaySet,
    DelayQuery,
    DelayResponse,
    StatusQuery,
    StatusResponse,
    ColorFlow,
    NameSet,
    NameResponse,
    Effect,
}

impl Role {
    /// Every role, in characteristic id order. This is also the batch requested during
    /// characteristic discovery.
    pub const ALL: [Role; 10] = [
        Role::Control,
        Role::DelaySet,
        Role::DelayQuery,
        Role::DelayResponse,
        Role::StatusQuery,
        Role::StatusResponse,
        Role::ColorFlow,
        Role::NameSet,
        Role::NameResponse,
        Role::Effect,
    ];

    pub const fn uuid(self) -> Uuid {
        match self {
            Role::Control => CONTROL_UUID,
            Role::DelaySet => DELAY_UUID,
            Role::DelayQuery => DELAY_QUERY_UUID,
            Role::DelayResponse => DELAY_RESPONSE_UUID,
            Role::StatusQuery => STATUS_QUERY_UUID,
            Role::StatusResponse => STATUS_RESPONSE_UUID,
            Role::ColorFlow => COLOR_FLOW_UUID,
            Role::NameSet => NAME_UUID,
            Role::NameResponse => NAME_RESPONSE_UUID,
            Role::Effect => EFFECT_UUID,
        }
    }

    pub fn from_uuid(uuid: &Uuid) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.uuid() == *uuid)
    }

    /// UUIDs of all ten characteristics.
    pub fn all_uuids() -> Vec<Uuid> {
        Role::ALL.iter().map(|role| role.uuid()).collect()
    }

    fn name(&self) -> &'static str {
        match self {
            Role::Control => "control",
            Role::DelaySet => "delay-set",
            Role::DelayQuery => "delay-query",
            Role::DelayResponse => "delay-response",
            Role::StatusQuery => "status-query",
            Role::StatusResponse => "status-response",
            Role::ColorFlow => "color-flow",
            Role::NameSet => "name-set",
            Role::NameResponse => "name-response",
            Role::Effect => "effect",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match short_uuid(&self.uuid()) {
            Some(short) => write!(f, "{} ({:04x})", self.name(), short),
            None => f.write_str(self.name()),
        }
    }
}
