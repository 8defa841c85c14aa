//! Discover BACnet devices with a global Who-Is.
//!
//! Usage:
//!   cargo run -p bacip-client --example discover_devices -- 192.168.1.10/24

use bacip_client::BacnetClient;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cidr = std::env::args()
        .nth(1)
        .ok_or("usage: discover_devices <interface-cidr>")?;

    let client = BacnetClient::new(&cidr, 47808).await?;
    let receiver = client.start();

    let devices = client.who_is(None, Duration::from_secs(3)).await?;
    if devices.is_empty() {
        println!("No devices found.");
    } else {
        for device in &devices {
            println!(
                "{} at {} (vendor {}, max apdu {})",
                device.device_id, device.address, device.vendor_id, device.max_apdu
            );
        }
        println!("\nDiscovered {} device(s).", devices.len());
    }

    client.close()?;
    receiver.await??;
    Ok(())
}
