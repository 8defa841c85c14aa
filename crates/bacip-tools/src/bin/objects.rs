use bacip_client::BacnetClient;
use bacip_tools::{NetworkArgs, TargetArgs};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bacip-objects")]
struct Args {
    #[command(flatten)]
    network: NetworkArgs,
    #[command(flatten)]
    target: TargetArgs,
    /// Device instance whose object-list is read.
    #[arg(long)]
    instance: u32,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = BacnetClient::new(&args.network.cidr, args.network.port).await?;
    let run = client.start();

    let result = client.objects(&args.target.address(), args.instance).await;
    client.close()?;
    run.await??;

    match result {
        Ok(objects) if args.json => println!("{}", serde_json::to_string_pretty(&objects)?),
        Ok(objects) => {
            println!("device {} lists {} objects:", args.instance, objects.len());
            for object in &objects {
                println!("  {object}");
            }
        }
        Err(e) => {
            eprintln!("object-list read failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
