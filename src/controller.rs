// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The coordinating loop.
//!
//! A [`Controller`] owns one transport and consumes two inputs: the transport's event stream
//! (adapter power changes, discoveries, disconnects) and the inbound intent channel fed through a
//! [`ControllerHandle`]. Everything it has to say comes out of the [`Output`] channel.
//!
//! Commands run to completion inside the loop, one at a time, so frames for different intents are
//! never interleaved on a bulb. Acquisitions run as separate tasks because of their settle delay.

use futures::stream::StreamExt;
use log::{debug, info, warn};
use static_assertions::assert_impl_all;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::{Transport, TransportEvent};
use crate::common::util::send_output;
use crate::config::ControllerConfig;
use crate::dispatch::IntentDispatcher;
use crate::pipeline::AcquisitionPipeline;
use crate::registry::{DeviceRegistry, RegistryView};
use crate::scan::{ScanLifecycle, Startup, StatusUpdate};
use crate::{Error, Result};

/// Messages produced by a running controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Status(StatusUpdate),
    /// An inbound intent payload, forwarded unchanged whether or not it was recognised.
    Intent(String),
}

#[derive(Debug)]
enum Inbound {
    Intent(String),
    Close,
}

/// Sends intents to a running [`Controller`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    sender: UnboundedSender<Inbound>,
}

impl ControllerHandle {
    /// Queues an intent payload such as `"on"` or `"flow"`.
    pub fn send(&self, payload: impl Into<String>) -> Result<()> {
        self.sender
            .send(Inbound::Intent(payload.into()))
            .map_err(|_| Error::ControllerClosed)
    }

    /// Asks the controller to stop scanning and return from [`Controller::run`].
    pub fn close(&self) -> Result<()> {
        self.sender
            .send(Inbound::Close)
            .map_err(|_| Error::ControllerClosed)
    }
}

assert_impl_all!(ControllerHandle: Clone, Send, Sync);

pub struct Controller<T: Transport> {
    transport: T,
    config: Arc<ControllerConfig>,
    registry: DeviceRegistry<T::Peripheral>,
    inbound: UnboundedReceiver<Inbound>,
    output: UnboundedSender<Output>,
}

impl<T: Transport> Controller<T> {
    pub fn new(
        transport: T,
        config: ControllerConfig,
    ) -> (Self, ControllerHandle, UnboundedReceiver<Output>) {
        let (inbound_sender, inbound) = mpsc::unbounded_channel();
        let (output, output_receiver) = mpsc::unbounded_channel();
        let controller = Controller {
            transport,
            config: Arc::new(config),
            registry: DeviceRegistry::new(),
            inbound,
            output,
        };
        (
            controller,
            ControllerHandle {
                sender: inbound_sender,
            },
            output_receiver,
        )
    }

    /// A read-only view of the characteristics discovered by this controller.
    pub fn registry(&self) -> RegistryView<T::Peripheral> {
        self.registry.view()
    }

    /// Runs until closed through a handle, until every handle is dropped, or until the transport
    /// stops producing events. Scanning is stopped on the way out.
    pub async fn run(self) -> Result<()> {
        let Controller {
            transport,
            config,
            registry,
            mut inbound,
            output,
        } = self;

        // Subscribe before reading the adapter state so no power change slips between the two.
        let mut events = transport.events().await?;
        let mut scan = ScanLifecycle::new(transport, config.scan_filter());
        let pipeline = AcquisitionPipeline::new(registry.clone(), config.clone());
        let dispatcher = IntentDispatcher::new(registry.clone());

        match scan.initialize().await {
            Startup::Started(status) => {
                if let Some(status) = status {
                    send_output(&output, Output::Status(status));
                }
            }
            Startup::Deferred(status) => {
                let output = output.clone();
                let delay = config.warning_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    send_output(&output, Output::Status(status));
                });
            }
        }

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(TransportEvent::StateChanged(state)) => {
                        if !state.is_powered_on() && !registry.is_empty() {
                            info!("Adapter is {}, forgetting {} characteristics", state, registry.len());
                            registry.clear();
                        }
                        if let Some(status) = scan.on_adapter_state(state).await {
                            send_output(&output, Output::Status(status));
                        }
                    }
                    Some(TransportEvent::PeripheralDiscovered(peripheral)) => {
                        pipeline.on_discovered(peripheral).await;
                    }
                    Some(TransportEvent::PeripheralDisconnected(id)) => {
                        let removed = registry.remove_peripheral(&id);
                        if removed > 0 {
                            info!("{} disconnected, dropped {} characteristics", id, removed);
                        }
                    }
                    None => {
                        warn!("Transport event stream ended");
                        break;
                    }
                },
                message = inbound.recv() => match message {
                    Some(Inbound::Intent(payload)) => {
                        send_output(&output, Output::Intent(payload.clone()));
                        dispatcher.handle(&payload).await;
                    }
                    Some(Inbound::Close) | None => {
                        debug!("Controller closing");
                        break;
                    }
                },
            }
        }

        if let Some(status) = scan.close().await {
            send_output(&output, Output::Status(status));
        }
        Ok(())
    }
}
