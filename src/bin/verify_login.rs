use clap::Parser;
use psvue_client_lib::api::VueClient;
use psvue_client_lib::config::{default_save_path, Settings};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Run the full login flow and report the session state")]
struct Args {
    /// Account email (overrides the saved settings)
    #[arg(long)]
    email: Option<String>,

    /// Account password (overrides the saved settings)
    #[arg(long)]
    password: Option<String>,

    /// Drop the stored credentials and start from a fresh device id
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::load().unwrap_or_default();
    let email = args.email.unwrap_or(settings.email);
    let password = args.password.unwrap_or(settings.password);

    let save_path =
        default_save_path().ok_or_else(|| anyhow::anyhow!("no writable data directory"))?;
    println!("Data path: {:?}", save_path);

    let client = VueClient::new(&save_path, settings.verify_ssl).await?;

    if args.reset {
        client.credentials().reset()?;
        println!("Stored credentials reset.");
    }

    if client.is_session_valid()? {
        println!("Stored session is still valid, skipping login.");
    } else {
        println!("Logging in as {}...", email);
        client.login(&email, &password).await?;
        println!("Login succeeded.");
    }

    let profiles = client.get_profile_names().await?;
    println!("Profiles on this account:");
    for name in profiles {
        println!("  - {}", name);
    }

    Ok(())
}
