use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gaconnect::config::Config;
use gaconnect::google::{ActiveVisitorsQuery, RestClient, RESOURCE_OWNER};
use gaconnect::models::Module;
use gaconnect::storage;

#[derive(Parser)]
#[command(name = "gaconnect-admin")]
#[command(about = "Google Analytics connection admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the registered Google OAuth application
    Application {
        #[command(subcommand)]
        action: ApplicationAction,
    },
    /// List connected locations
    Locations {
        /// Only show one module (google-analytics, website)
        #[arg(long)]
        module: Option<Module>,
    },
    /// List connected Analytics profiles
    Profiles,
    /// Run a report for a connected location
    Report {
        #[command(subcommand)]
        report: ReportKind,
    },
}

#[derive(Subcommand)]
enum ApplicationAction {
    /// Register or replace the client id and secret
    Set { app_key: String, app_secret: String },
    /// Show the registered application
    Show,
}

#[derive(Subcommand)]
enum ReportKind {
    /// Most active visitors (experimental)
    ActiveVisitors {
        location_id: i64,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
        #[arg(long, default_value = "city")]
        dimension: String,
        #[arg(long, default_value_t = 1)]
        min_sessions: u64,
        #[arg(long, default_value_t = 0.0)]
        min_avg_session_duration: f64,
        #[arg(long, default_value_t = 100.0)]
        max_bounce_rate: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let storage = storage::open(&config.database).await?;

    match cli.command {
        Commands::Application { action } => match action {
            ApplicationAction::Set {
                app_key,
                app_secret,
            } => {
                let application = storage
                    .upsert_application(RESOURCE_OWNER, &app_key, &app_secret)
                    .await?;
                println!("✓ Registered application {} ({})", application.id, application.app_key);
            }
            ApplicationAction::Show => match storage.get_application(RESOURCE_OWNER).await? {
                Some(application) => {
                    println!("ID:        {}", application.id);
                    println!("Owner:     {}", application.resource_owner);
                    println!("Client ID: {}", application.app_key);
                }
                None => println!("No Google application registered."),
            },
        },
        Commands::Locations { module } => {
            let locations = storage.list_locations(module).await?;
            if locations.is_empty() {
                println!("No locations found.");
            } else {
                println!("{:<6} {:<18} {:<8} {:<30} {}", "ID", "Module", "Channel", "Name", "URL");
                println!("{}", "-".repeat(100));
                for location in locations {
                    let channel = location
                        .channel_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<6} {:<18} {:<8} {:<30} {}",
                        location.id, location.module, channel, location.name, location.url
                    );
                }
            }
        }
        Commands::Profiles => {
            let profiles = storage.list_profiles().await?;
            if profiles.is_empty() {
                println!("No profiles connected.");
            } else {
                println!("{:<12} {:<12} {:<16} {:<9} {:<8} {}", "Profile", "Account", "Property", "Location", "Website", "Name");
                println!("{}", "-".repeat(90));
                for profile in profiles {
                    let website = profile
                        .belonging_location_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<12} {:<12} {:<16} {:<9} {:<8} {}",
                        profile.profile_id,
                        profile.account_id,
                        profile.property_id,
                        profile.location_id,
                        website,
                        profile.display_name
                    );
                }
            }
        }
        Commands::Report { report } => match report {
            ReportKind::ActiveVisitors {
                location_id,
                start_date,
                end_date,
                dimension,
                min_sessions,
                min_avg_session_duration,
                max_bounce_rate,
            } => {
                if storage.get_location(location_id).await?.is_none() {
                    bail!("location {location_id} not found");
                }

                let client = RestClient::new(&config.google)?;
                let reporter = client
                    .connect_by_location(storage.as_ref(), location_id)
                    .await
                    .with_context(|| format!("cannot authenticate location {location_id}"))?;

                let report = reporter
                    .most_active_visitors(&ActiveVisitorsQuery {
                        start_date,
                        end_date,
                        dimension,
                        min_sessions,
                        min_avg_session_duration,
                        max_bounce_rate,
                    })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        },
    }

    Ok(())
}
