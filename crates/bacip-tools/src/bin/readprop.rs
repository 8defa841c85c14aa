use bacip_client::BacnetClient;
use bacip_core::types::ObjectId;
use bacip_tools::{NetworkArgs, ObjectTypeArg, PropertyArg, TargetArgs};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bacip-readprop")]
struct Args {
    #[command(flatten)]
    network: NetworkArgs,
    #[command(flatten)]
    target: TargetArgs,
    #[arg(long, value_enum, default_value = "device")]
    object_type: ObjectTypeArg,
    #[arg(long, default_value_t = 0)]
    instance: u32,
    #[arg(long, value_enum, default_value = "object-name")]
    property: PropertyArg,
    #[arg(long)]
    index: Option<u32>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = BacnetClient::new(&args.network.cidr, args.network.port).await?;
    let run = client.start();

    let object_id = ObjectId::new(args.object_type.into_object_type(), args.instance);
    let result = client
        .read_property(
            &args.target.address(),
            object_id,
            args.property.into_property_id(),
            args.index,
        )
        .await;
    client.close()?;
    run.await??;

    match result {
        Ok(v) if args.json => println!("{}", serde_json::to_string_pretty(&v)?),
        Ok(v) => println!("{v}"),
        Err(e) => {
            eprintln!("read failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
