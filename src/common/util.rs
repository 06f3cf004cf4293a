// yeelight-ble Source Code File
//
// Copyright 2024 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use log::{trace, warn};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::Result;

pub fn send_output<T: Debug>(sender: &UnboundedSender<T>, message: T) {
    if let Err(lost) = sender.send(message) {
        trace!("Lost output, while nothing subscribed: {:?}", lost.0);
    }
}

/// Runs `operation` once plus up to `retries` more times, sleeping `delay` between attempts.
pub async fn retry<T, F, Fut>(what: &str, retries: u32, delay: Duration, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!("{} failed ({}), retry {}/{}", what, e, attempt, retries);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
