use anyhow::{Context, anyhow};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use std::path::PathBuf;

use zipweather_core::{
    Config, ErrorKind, LocationStore, WeatherClient, WeatherError, WeatherReading,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "zipweather", version, about = "Current weather by US ZIP code")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherStack API key and the locations file path.
    Configure,

    /// Show current weather for one or more ZIP codes.
    Show {
        /// 5-digit ZIP codes.
        #[arg(required = true)]
        zip_codes: Vec<String>,

        /// Save each location after a successful lookup.
        #[arg(long)]
        save: bool,
    },

    /// Show current weather for every saved location.
    Refresh {
        /// Only favorite locations.
        #[arg(long)]
        favorites: bool,
    },

    /// Manage saved locations.
    #[command(subcommand)]
    Locations(LocationsCommand),
}

#[derive(Debug, Subcommand)]
pub enum LocationsCommand {
    /// List saved locations.
    List,

    /// Save a location under a display name.
    Add { zip_code: String, name: String },

    /// Forget a saved location.
    Remove { zip_code: String },

    /// Mark a saved location as favorite.
    Favorite {
        zip_code: String,

        /// Clear the favorite flag instead.
        #[arg(long)]
        unset: bool,
    },

    /// Forget all saved locations.
    Clear {
        /// Don't ask for confirmation.
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { zip_codes, save } => {
                let cfg = Config::load()?;
                let mut store = if save { Some(open_store(&cfg)?) } else { None };
                show(&cfg, &zip_codes, store.as_mut()).await
            }
            Command::Refresh { favorites } => {
                let cfg = Config::load()?;
                let store = open_store(&cfg)?;
                let zip_codes: Vec<String> = if favorites {
                    store.get_favorite_locations().into_keys().map(String::from).collect()
                } else {
                    store.get_locations().into_iter().map(String::from).collect()
                };

                if zip_codes.is_empty() {
                    println!("No saved locations.");
                    return Ok(());
                }
                show(&cfg, &zip_codes, None).await
            }
            Command::Locations(cmd) => {
                let cfg = Config::load()?;
                let mut store = open_store(&cfg)?;
                locations(&mut store, cmd)
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("WeatherStack API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_validator(inquire::required!("An API key is required"))
        .with_help_message("Get one at https://weatherstack.com/signup")
        .prompt()
        .context("API key prompt aborted")?;
    cfg.set_api_key(api_key);

    let current = cfg.storage_path()?;
    let storage = Text::new("Locations file:")
        .with_default(&current.display().to_string())
        .prompt()
        .context("Storage path prompt aborted")?;
    let storage = PathBuf::from(storage.trim());
    if storage != current {
        cfg.storage_file = Some(storage);
    }

    cfg.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_store(cfg: &Config) -> anyhow::Result<LocationStore> {
    Ok(LocationStore::open(cfg.storage_path()?)?)
}

async fn show(
    cfg: &Config,
    zip_codes: &[String],
    mut store: Option<&mut LocationStore>,
) -> anyhow::Result<()> {
    let mut client = WeatherClient::new(&cfg.api_key()?, cfg.client_config()?)?;
    let mut failures = 0usize;
    let mut save_error = None;

    for zip in zip_codes {
        match client.get_weather(zip).await {
            Ok(reading) => {
                print_reading(&reading);
                if let Some(store) = store.as_deref_mut() {
                    if let Err(err) = store.add_location(zip, &reading.location_name) {
                        save_error = Some(err);
                        break;
                    }
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("{zip}: {}", describe_weather_error(&err));
            }
        }
    }

    client.cleanup();
    lookup_outcome(zip_codes.len(), failures, save_error)
}

/// Folds the per-ZIP results of `show` into the command result.
fn lookup_outcome(
    requested: usize,
    failures: usize,
    save_error: Option<WeatherError>,
) -> anyhow::Result<()> {
    log::info!("Looked up {requested} locations, {failures} failed");

    if let Some(err) = save_error {
        return Err(err.into());
    }
    if failures > 0 {
        return Err(anyhow!("{failures} of {requested} lookups failed"));
    }
    Ok(())
}

fn locations(store: &mut LocationStore, cmd: LocationsCommand) -> anyhow::Result<()> {
    match cmd {
        LocationsCommand::List => {
            if store.is_empty() {
                println!("No saved locations.");
            }
            for zip in store.get_locations() {
                let Some(loc) = store.get_location(zip.as_str())? else {
                    continue;
                };
                let star = if loc.is_favorite { "*" } else { " " };
                let added = loc
                    .added_at
                    .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{star} {zip}  {:<30} added {added}", loc.name);
            }
        }
        LocationsCommand::Add { zip_code, name } => {
            store.add_location(&zip_code, &name)?;
            println!("Saved {name} ({zip_code})");
        }
        LocationsCommand::Remove { zip_code } => {
            if store.remove_location(&zip_code)? {
                println!("Removed {zip_code}");
            } else {
                println!("{zip_code} was not saved");
            }
        }
        LocationsCommand::Favorite { zip_code, unset } => {
            store.set_favorite(&zip_code, !unset)?;
            println!("{zip_code} {} favorites", if unset { "removed from" } else { "added to" });
        }
        LocationsCommand::Clear { yes } => {
            let confirmed = yes
                || Confirm::new(&format!("Forget all {} saved locations?", store.len()))
                    .with_default(false)
                    .prompt()
                    .context("Confirmation prompt aborted")?;
            if confirmed {
                store.clear()?;
                println!("Cleared saved locations");
            }
        }
    }

    Ok(())
}

fn print_reading(reading: &WeatherReading) {
    println!("{} ({})", reading.location_name, reading.zip_code);
    println!("  {:.1}°F  {}", reading.temperature, reading.description);
    println!("  Humidity {}%  Wind {:.1} mph", reading.humidity, reading.wind_speed);
    println!(
        "  Observed {}",
        reading.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
}

fn describe_weather_error(err: &WeatherError) -> String {
    match err.kind() {
        ErrorKind::Validation => err.to_string(),
        ErrorKind::Configuration => format!("{err}\nHint: run `zipweather configure`."),
        ErrorKind::Network | ErrorKind::Timeout => {
            format!("{err}\nCheck your connection and try again.")
        }
        ErrorKind::Provider => format!("The weather service rejected the request. {err}"),
        ErrorKind::MalformedResponse => {
            format!("Unexpected response from the weather service. {err}")
        }
        ErrorKind::Storage => format!("Could not access saved locations. {err}"),
        ErrorKind::NotFound => format!("{err}. Save it first with `zipweather locations add`."),
    }
}

/// Human-readable message for a failed command.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<WeatherError>() {
        Some(weather) => describe_weather_error(weather),
        None => format!("{err:#}"),
    }
}
