use bacip_client::BacnetClient;
use bacip_tools::NetworkArgs;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bacip-whois")]
struct Args {
    #[command(flatten)]
    network: NetworkArgs,
    #[arg(long, default_value_t = 3)]
    timeout_secs: u64,
    /// Lowest device instance to ask for; needs --high.
    #[arg(long, requires = "high")]
    low: Option<u32>,
    #[arg(long, requires = "low")]
    high: Option<u32>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = BacnetClient::new(&args.network.cidr, args.network.port).await?;
    let run = client.start();

    let range = args.low.zip(args.high);
    let devices = client
        .who_is(range, Duration::from_secs(args.timeout_secs))
        .await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        for d in &devices {
            println!(
                "{} at {} (vendor {}, max apdu {}, {:?})",
                d.device_id, d.address, d.vendor_id, d.max_apdu, d.segmentation
            );
        }
    }

    client.close()?;
    run.await??;
    Ok(())
}
