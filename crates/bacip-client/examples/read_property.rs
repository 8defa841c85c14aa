//! Read the object-name of a device.
//!
//! Usage:
//!   cargo run -p bacip-client --example read_property -- 192.168.1.10/24 192.168.1.100 1

use bacip_client::BacnetClient;
use bacip_core::types::{ObjectId, ObjectType, PropertyId};
use bacip_datalink::{BacnetAddress, DataLinkAddress};
use std::net::IpAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let usage = "usage: read_property <interface-cidr> <device-ip> <device-instance>";
    let cidr = args.next().ok_or(usage)?;
    let ip: IpAddr = args.next().ok_or(usage)?.parse()?;
    let instance: u32 = args.next().ok_or(usage)?.parse()?;

    let client = BacnetClient::new(&cidr, 47808).await?;
    let receiver = client.start();

    let device = BacnetAddress::local(DataLinkAddress::bacnet_default(ip));
    let value = client
        .read_property(
            &device,
            ObjectId::new(ObjectType::Device, instance),
            PropertyId::ObjectName,
            None,
        )
        .await?;
    println!("Device object-name: {value}");

    client.close()?;
    receiver.await??;
    Ok(())
}
