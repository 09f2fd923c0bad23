use clap::Parser;
use psvue_client_lib::api::VueClient;
use psvue_client_lib::config::{default_save_path, Settings};
use psvue_client_lib::manifest::{select_bitrate, sorted_bitrates_desc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Resolve a playable stream URL for an airing or channel")]
struct Args {
    /// Airing id to resolve
    #[arg(long, conflicts_with = "channel_id")]
    airing_id: Option<String>,

    /// Live channel id to resolve
    #[arg(long)]
    channel_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::load().unwrap_or_default();
    let save_path =
        default_save_path().ok_or_else(|| anyhow::anyhow!("no writable data directory"))?;
    let client = VueClient::new(&save_path, settings.verify_ssl).await?;

    if !client.is_session_valid()? {
        client.login(&settings.email, &settings.password).await?;
    }

    // Stream resolution is where geo-location/stale-subscription faults
    // show up, so run it under the one-shot re-auth wrapper.
    let source = client
        .with_reauth(&settings.email, &settings.password, || async {
            match (&args.airing_id, &args.channel_id) {
                (Some(airing_id), _) => client.get_stream_url(airing_id).await,
                (None, Some(channel_id)) => client.get_channel_stream_url(channel_id).await,
                (None, None) => Err(psvue_client_lib::errors::VueError::Auth(
                    "pass --airing-id or --channel-id".to_string(),
                )),
            }
        })
        .await?;

    println!("Master manifest: {}", source.manifest);
    println!("Available bitrates (kbps):");
    for bitrate in sorted_bitrates_desc(&source.bitrates) {
        println!("  {:>6}  {}", bitrate, source.bitrates[&bitrate]);
    }

    match select_bitrate(
        &source.bitrates,
        settings.preferred_bitrate,
        settings.max_bitrate_allowed,
    ) {
        Some(bitrate) => println!("\nSelected {} kbps -> {}", bitrate, source.bitrates[&bitrate]),
        None => println!("\nNo automatic selection (ask the user or relax the bitrate cap)."),
    }

    Ok(())
}
