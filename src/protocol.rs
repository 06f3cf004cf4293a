// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Command frames understood by the bulb firmware.
//!
//! Every command is ASCII: decimal fields separated by commas (or a short literal), right padded
//! with `,` to the width of the target characteristic. Control frames are 18 bytes wide and go to
//! the control characteristic; color flow frames are 20 bytes wide and go to the color flow
//! characteristic.

use log::{debug, warn};
use std::fmt::{self, Debug, Display, Formatter};

use crate::api::{Peripheral, WriteType};
use crate::constants::{Role, COLOR_FLOW_FRAME_WIDTH, CONTROL_FRAME_WIDTH};
use crate::registry::DiscoveredCharacteristic;
use crate::{Error, Result};

const PAD: u8 = b',';

/// First waypoint of the built-in color flow: index 0, pure blue at full brightness.
pub const FLOW_WAYPOINT_START: [i32; 6] = [0, 0, 255, 0, 100, 1];
/// Second waypoint of the built-in color flow: index 1, white at full brightness.
pub const FLOW_WAYPOINT_END: [i32; 6] = [1, 255, 255, 255, 100, 1];
/// Tells the firmware to apply the waypoints written so far.
pub const FLOW_COMMIT: &str = "CB";

/// An immutable, fixed width command payload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Pads `command` with commas up to `width` bytes.
    pub fn padded(command: &str, width: usize) -> Result<Frame> {
        if command.len() > width {
            return Err(Error::FrameOverflow {
                width,
                len: command.len(),
            });
        }
        let mut bytes = Vec::with_capacity(width);
        bytes.extend_from_slice(command.as_bytes());
        bytes.resize(width, PAD);
        Ok(Frame(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Frame({:?})", String::from_utf8_lossy(&self.0))
    }
}

fn join_fields<I>(fields: I) -> String
where
    I: IntoIterator<Item = Option<i32>>,
{
    fields
        .into_iter()
        .map(|field| field.map(|value| value.to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the 18 byte `red,green,blue,brightness` frame for the control characteristic.
///
/// `None` channels are written as empty fields, which the firmware reads as "keep the current
/// color". Values are not range checked; the firmware decides what to do with them.
pub fn encode_control(
    red: Option<i32>,
    green: Option<i32>,
    blue: Option<i32>,
    brightness: i32,
) -> Result<Frame> {
    let command = join_fields([red, green, blue, Some(brightness)]);
    Frame::padded(&command, CONTROL_FRAME_WIDTH)
}

/// Builds the three 20 byte frames of the built-in color flow, in the order they must be written.
pub fn encode_color_flow() -> Result<[Frame; 3]> {
    let start = join_fields(FLOW_WAYPOINT_START.map(Some));
    let end = join_fields(FLOW_WAYPOINT_END.map(Some));
    Ok([
        Frame::padded(&start, COLOR_FLOW_FRAME_WIDTH)?,
        Frame::padded(&end, COLOR_FLOW_FRAME_WIDTH)?,
        Frame::padded(FLOW_COMMIT, COLOR_FLOW_FRAME_WIDTH)?,
    ])
}

/// A fully resolved bulb command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// One control frame.
    Control {
        red: Option<i32>,
        green: Option<i32>,
        blue: Option<i32>,
        brightness: i32,
    },
    /// The built-in two waypoint color flow.
    ColorFlow,
}

impl Command {
    pub fn color(red: i32, green: i32, blue: i32, brightness: i32) -> Command {
        Command::Control {
            red: Some(red),
            green: Some(green),
            blue: Some(blue),
            brightness,
        }
    }

    /// Characteristic the frames of this command are written to.
    pub fn role(&self) -> Role {
        match self {
            Command::Control { .. } => Role::Control,
            Command::ColorFlow => Role::ColorFlow,
        }
    }

    /// The frames of this command, in write order.
    pub fn frames(&self) -> Result<Vec<Frame>> {
        match *self {
            Command::Control {
                red,
                green,
                blue,
                brightness,
            } => Ok(vec![encode_control(red, green, blue, brightness)?]),
            Command::ColorFlow => Ok(encode_color_flow()?.to_vec()),
        }
    }

    /// Writes the frames of this command to `target`, one after another.
    ///
    /// Each write starts only once the previous one completed. A failed write stops the
    /// sequence, so a color flow may be left partially applied.
    pub async fn write_to<P: Peripheral>(&self, target: &DiscoveredCharacteristic<P>) -> Result<()> {
        if !target.characteristic.properties.is_writable() {
            warn!(
                "{} on {} does not advertise write support, writing anyway",
                target.role,
                target.peripheral.id()
            );
        }
        let frames = self.frames()?;
        let total = frames.len();
        for (index, frame) in frames.iter().enumerate() {
            debug!(
                "Writing {:?} to {} on {} ({}/{})",
                frame,
                target.role,
                target.peripheral.id(),
                index + 1,
                total
            );
            target
                .peripheral
                .write(&target.characteristic, frame.as_bytes(), WriteType::WithResponse)
                .await
                .map_err(|e| {
                    Error::WriteFailed(format!("{}: {}", target.peripheral.id(), e))
                })?;
        }
        Ok(())
    }
}
