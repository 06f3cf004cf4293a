// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! yeelight-ble drives Yeelight Blue II smart bulbs over Bluetooth LE.
//!
//! The bulbs expose a vendor service (`fff0`) whose characteristics accept fixed width, comma
//! padded ASCII frames. This crate finds bulbs while the radio is powered on, connects to them,
//! resolves their characteristics and turns high level intents ("on", "off", "red", "green",
//! "blue", "flow") into the exact frames the firmware expects.
//!
//! The radio itself is reached through the [`api::Transport`] and [`api::Peripheral`] traits.
//! On Linux, [`platform`] provides an implementation on top of BlueZ.
//!
//! # Usage
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # async fn run() -> yeelight_ble::Result<()> {
//! use yeelight_ble::config::ControllerConfig;
//! use yeelight_ble::controller::{Controller, Output};
//! use yeelight_ble::platform::Adapter;
//!
//! let adapter = Adapter::default_adapter().await?;
//! let (controller, handle, mut output) = Controller::new(adapter, ControllerConfig::default());
//! tokio::spawn(controller.run());
//!
//! handle.send("on")?;
//! while let Some(message) = output.recv().await {
//!     if let Output::Status(status) = message {
//!         println!("{:?}", status);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
#[cfg(target_os = "linux")]
mod bluez;
mod common;
pub mod config;
pub mod constants;
pub mod controller;
pub mod dispatch;
#[cfg(test)]
mod mock;
pub mod pipeline;
#[cfg(target_os = "linux")]
pub mod platform;
pub mod protocol;
pub mod registry;
pub mod scan;

use std::result;

use crate::api::AdapterState;
use crate::constants::Role;

/// The main error type returned by most methods in yeelight-ble.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bluetooth adapter is not ready: {0}")]
    AdapterUnavailable(AdapterState),

    #[error("Connecting to peripheral failed: {0}")]
    ConnectFailed(String),

    #[error("Vendor service discovery failed: {0}")]
    ServiceDiscoveryFailed(String),

    #[error("Characteristic discovery failed: {0}")]
    CharacteristicDiscoveryFailed(String),

    #[error("Characteristic write failed: {0}")]
    WriteFailed(String),

    #[error("No {0} characteristic has been discovered")]
    CharacteristicNotFound(Role),

    #[error("Command of {len} bytes does not fit a {width} byte frame")]
    FrameOverflow { width: usize, len: usize },

    #[error("Not connected")]
    NotConnected,

    #[error("Controller has shut down")]
    ControllerClosed,

    #[error("{}", _0)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type for a result using the yeelight-ble [`Error`] type.
pub type Result<T> = result::Result<T, Error>;
