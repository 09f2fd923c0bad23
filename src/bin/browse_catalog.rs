use clap::Parser;
use psvue_client_lib::api::{choose_profile_name, VueClient, DEFAULT_OFFSET, DEFAULT_SIZE};
use psvue_client_lib::config::{default_save_path, Settings};
use psvue_client_lib::listing::{genre_line, status_line};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Walk the catalog: categories, sortings, program listings")]
struct Args {
    /// Category title to drill into (default: just list categories)
    #[arg(long)]
    category: Option<String>,

    /// Sorting index within the category to fetch programs from
    #[arg(long, default_value_t = 0)]
    sorting: usize,

    /// Page size for the program listing
    #[arg(long, default_value = DEFAULT_SIZE)]
    size: String,
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

    // Listings POST the active profile's favorites payload, so a profile
    // must be selected before anything is fetched.
    let names = client.get_profile_names().await?;
    let Some(profile_name) = choose_profile_name(&settings.profile_name, &names) else {
        anyhow::bail!(
            "account has several profiles; set profile_name in settings to one of {:?}",
            names
        );
    };
    if !client.set_profile(&profile_name).await? {
        anyhow::bail!("no profile named {:?} on this account", profile_name);
    }
    println!("Using profile {:?}.", profile_name);

    let categories = client.get_categories().await?;
    println!("Categories:");
    for category in &categories {
        println!("  - {}", category.title);
    }

    let Some(wanted) = args.category else {
        return Ok(());
    };
    let Some(category) = categories.iter().find(|c| c.title == wanted) else {
        anyhow::bail!("no category named {:?}", wanted);
    };

    let sortings = client
        .parse_category_sortings(&category.url, DEFAULT_OFFSET, &args.size)
        .await?;

    // A lone sorting goes straight to its listing; the menu only appears
    // when there is an actual choice to make.
    let sorting = if let [only] = sortings.as_slice() {
        only
    } else {
        println!("\nSortings in {:?}:", category.title);
        for (index, sorting) in sortings.iter().enumerate() {
            println!("  [{}] {}", index, sorting.title);
        }
        let Some(sorting) = sortings.get(args.sorting) else {
            anyhow::bail!("sorting index {} out of range", args.sorting);
        };
        sorting
    };
    let programs = client
        .get_programs(
            sorting.request_method,
            Some(&sorting.uri),
            None,
            None,
            None,
            DEFAULT_OFFSET,
            &args.size,
        )
        .await?;

    println!("\nPrograms under {:?} ({}):", sorting.title, programs.len());
    for program in &programs {
        println!(
            "  {} [{}] {}",
            program.title.as_deref().unwrap_or("(untitled)"),
            status_line(program),
            genre_line(program),
        );
    }

    Ok(())
}
