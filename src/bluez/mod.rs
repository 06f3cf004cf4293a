// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! BlueZ transport, talking to `bluetoothd` over D-Bus through `bluez-async`.

pub mod adapter;
pub mod peripheral;

use bluez_async::BluetoothError;

use crate::Error;

impl From<BluetoothError> for Error {
    fn from(error: BluetoothError) -> Self {
        Error::Other(Box::new(error))
    }
}
