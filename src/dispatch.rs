// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Maps inbound intents to bulb commands.

use log::{error, trace, warn};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::api::Peripheral;
use crate::protocol::Command;
use crate::registry::DeviceRegistry;
use crate::{Error, Result};

/// A recognised high level request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    On,
    Off,
    Red,
    Green,
    Blue,
    Flow,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::On,
        Intent::Off,
        Intent::Red,
        Intent::Green,
        Intent::Blue,
        Intent::Flow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::On => "on",
            Intent::Off => "off",
            Intent::Red => "red",
            Intent::Green => "green",
            Intent::Blue => "blue",
            Intent::Flow => "flow",
        }
    }

    pub fn command(&self) -> Command {
        match self {
            Intent::On => Command::color(255, 255, 255, 100),
            Intent::Off => Command::Control {
                red: None,
                green: None,
                blue: None,
                brightness: 0,
            },
            Intent::Red => Command::color(255, 0, 0, 100),
            Intent::Green => Command::color(0, 255, 0, 100),
            Intent::Blue => Command::color(0, 0, 255, 100),
            Intent::Flow => Command::ColorFlow,
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised intent: {0:?}")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    /// Payloads are matched exactly; "On" or " on" are not intents.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| UnknownIntent(s.to_owned()))
    }
}

/// Writes `command` to the most recently discovered characteristic of its role.
pub async fn execute<P: Peripheral>(command: Command, registry: &DeviceRegistry<P>) -> Result<()> {
    let role = command.role();
    let target = registry
        .lookup(role)
        .ok_or(Error::CharacteristicNotFound(role))?;
    command.write_to(&target).await
}

#[derive(Debug, Clone)]
pub struct IntentDispatcher<P> {
    registry: DeviceRegistry<P>,
}

impl<P: Peripheral> IntentDispatcher<P> {
    pub fn new(registry: DeviceRegistry<P>) -> Self {
        IntentDispatcher { registry }
    }

    /// Parses `payload` and runs the mapped command. Unrecognised payloads are ignored.
    pub async fn dispatch(&self, payload: &str) -> Result<Option<Intent>> {
        let intent = match payload.parse::<Intent>() {
            Ok(intent) => intent,
            Err(e) => {
                trace!("{}", e);
                return Ok(None);
            }
        };
        execute(intent.command(), &self.registry).await?;
        Ok(Some(intent))
    }

    /// Like [`dispatch`](Self::dispatch), but logs failures instead of returning them.
    pub async fn handle(&self, payload: &str) {
        match self.dispatch(payload).await {
            Ok(_) => {}
            Err(e @ Error::CharacteristicNotFound(_)) => {
                warn!("Ignoring intent {:?}: {}", payload, e)
            }
            Err(e) => error!("Intent {:?} failed: {}", payload, e),
        }
    }
}
