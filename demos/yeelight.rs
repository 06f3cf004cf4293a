//! Finds a Yeelight Blue II, then plays the intents given on the command line.
//!
//! ```text
//! RUST_LOG=yeelight_ble=debug cargo run --example yeelight -- on red green blue flow off
//! ```

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::time::Duration;
    use yeelight_ble::config::ControllerConfig;
    use yeelight_ble::controller::{Controller, Output};
    use yeelight_ble::platform::Adapter;

    pretty_env_logger::init();

    let intents: Vec<String> = std::env::args().skip(1).collect();
    let adapter = Adapter::default_adapter().await?;
    let (controller, handle, mut output) = Controller::new(adapter, ControllerConfig::default());
    let registry = controller.registry();
    let task = tokio::spawn(controller.run());

    tokio::spawn(async move {
        while let Some(message) = output.recv().await {
            match message {
                Output::Status(status) => println!("status: {:?}", status),
                Output::Intent(payload) => println!("intent: {}", payload),
            }
        }
    });

    while registry.is_empty() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    // Give the remaining characteristics of the batch a moment to land.
    tokio::time::sleep(Duration::from_secs(1)).await;

    for intent in intents {
        handle.send(intent)?;
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    handle.close()?;
    task.await??;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("This demo needs the BlueZ transport, which is only available on Linux.");
}
