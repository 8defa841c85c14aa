use bacip_client::BacnetClient;
use bacip_core::services::write_property::WritePropertyRequest;
use bacip_core::types::{DataValue, ObjectId};
use bacip_tools::{NetworkArgs, ObjectTypeArg, TargetArgs};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bacip-writeprop")]
struct Args {
    #[command(flatten)]
    network: NetworkArgs,
    #[command(flatten)]
    target: TargetArgs,
    #[arg(long, value_enum, default_value = "analog-output")]
    object_type: ObjectTypeArg,
    #[arg(long)]
    instance: u32,
    #[arg(long)]
    value: f32,
    #[arg(long, default_value_t = 8)]
    priority: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = BacnetClient::new(&args.network.cidr, args.network.port).await?;
    let run = client.start();

    let request = WritePropertyRequest {
        priority: Some(args.priority),
        ..WritePropertyRequest::present_value(
            ObjectId::new(args.object_type.into_object_type(), args.instance),
            DataValue::Real(args.value),
        )
    };

    let result = client.write_property(&args.target.address(), request).await;
    client.close()?;
    run.await??;

    if let Err(e) = result {
        eprintln!("write failed: {e}");
        std::process::exit(1);
    }
    println!("write acknowledged");
    Ok(())
}
