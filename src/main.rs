mod config;
mod engine;
mod error;
mod gate;
mod geocode;
mod picker;
mod places;
mod provider;
mod route;
mod store;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use engine::AcquisitionEngine;
use gate::PermissionGate;
use geocode::HttpGeocoder;
use places::{HttpPlaceSearch, PlaceSearch};
use provider::{PositionProvider, SimulatedProvider};
use store::LocationStore;
use types::{Coordinate, GeoPoint};

#[derive(Parser)]
#[command(author, version, about = "Location coordination service diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize with a default config file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Run one acquisition+geocode cycle for a scripted device fix
    Locate {
        /// Latitude of the scripted fix
        lat: f64,

        /// Longitude of the scripted fix
        lon: f64,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Fetch place suggestions for a free-text query
    Search {
        /// Free-text query
        query: String,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Build a shareable static-map URL for a route
    Route {
        /// Route points as lat,lon pairs, in order
        #[arg(value_name = "LAT,LON", required = true)]
        points: Vec<String>,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show the active configuration
    Status {
        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { force, config } => init_config(config, *force),
        Commands::Locate { lat, lon, config } => {
            let config_data = load_config(config)?;
            locate(&config_data, Coordinate::new(*lat, *lon)).await
        }
        Commands::Search { query, config } => {
            let config_data = load_config(config)?;
            search(&config_data, query).await
        }
        Commands::Route { points, config } => {
            let config_data = load_config(config)?;
            print_route_url(&config_data, points)
        }
        Commands::Status { config } => {
            let config_data = load_config(config)?;
            status(&config_data);
            Ok(())
        }
    }
}

/// Feed the given coordinate through the full pipeline (permission gate,
/// service probe, acquisition, reverse geocode) using the simulated device
/// provider, and print the stored snapshot.
async fn locate(config: &Config, fix: Coordinate) -> Result<()> {
    let maps_key = config.require_maps_key()?;
    let geocoder = Arc::new(HttpGeocoder::new(maps_key)?);

    let provider = Arc::new(SimulatedProvider::new());
    provider.push_fix(fix); // service probe
    provider.push_fix(fix); // acquisition
    let provider: Arc<dyn PositionProvider> = provider;
    let engine = Arc::new(AcquisitionEngine::new(
        provider.clone(),
        PermissionGate::new(provider),
    ));
    let store = LocationStore::new(engine, geocoder);

    println!("Resolving {fix}...");
    let snapshot = store
        .refresh_current_location(config.acquire_options())
        .await
        .context("Failed to resolve location")?;

    println!("Coordinate: {}", snapshot.coordinate);
    println!("City:       {}", snapshot.address.city);
    println!("State:      {}", snapshot.address.state);
    println!("Country:    {}", snapshot.address.country);
    println!("Pincode:    {}", snapshot.address.pincode);
    println!("Address:    {}", snapshot.address.address_line());
    println!("Resolved:   {}", snapshot.resolved_at.to_rfc3339());
    println!(
        "GeoJSON:    {}",
        serde_json::to_string(&GeoPoint::from(snapshot.coordinate))?
    );

    Ok(())
}

/// Parse "lat,lon" route points and print the static-map export URL.
fn print_route_url(config: &Config, points: &[String]) -> Result<()> {
    let maps_key = config.require_maps_key()?;

    let mut coordinates = Vec::with_capacity(points.len());
    for point in points {
        let (lat, lon) = point
            .split_once(',')
            .with_context(|| format!("Invalid point '{point}', expected LAT,LON"))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("Invalid latitude in '{point}'"))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .with_context(|| format!("Invalid longitude in '{point}'"))?;
        coordinates.push(Coordinate::new(latitude, longitude));
    }

    let url = route::static_map_url(maps_key, &coordinates)?;
    println!("{url}");
    Ok(())
}

async fn search(config: &Config, query: &str) -> Result<()> {
    let places_key = config.require_places_key()?;
    let places = HttpPlaceSearch::new(places_key)?;

    let suggestions = places
        .search(query, config.suggestion_limit)
        .await
        .context("Suggestion lookup failed")?;

    if suggestions.is_empty() {
        println!("No suggestions for '{query}'");
        return Ok(());
    }
    println!("Suggestions for '{query}':");
    for suggestion in &suggestions {
        println!("  {} {}", suggestion.coordinate, suggestion.label);
    }

    Ok(())
}

fn status(config: &Config) {
    let key_state = |key: &Option<String>| match key.as_deref() {
        Some(k) if !k.is_empty() => "set",
        _ => "not set",
    };

    println!("waymark Status");
    println!("==============");
    println!("Configuration:");
    println!("  Maps API key:      {}", key_state(&config.maps_api_key));
    println!("  Places API key:    {}", key_state(&config.places_api_key));
    println!("  Position timeout:  {} ms", config.position_timeout_ms);
    println!("  Max cache age:     {} ms", config.max_cache_age_ms);
    println!("  High accuracy:     {}", config.high_accuracy);
    println!("  Search debounce:   {} ms", config.search_debounce_ms);
    println!("  Min query length:  {}", config.min_query_len);
    println!("  Suggestion limit:  {}", config.suggestion_limit);
}

fn init_config(config_path_opt: &Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = Config::get_config_path(config_path_opt);

    if config_path.exists() && !force {
        println!("Config file already exists at {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::default();
    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("Created config file at {}", config_path.display());
    Ok(())
}

fn load_config(config_path_opt: &Option<PathBuf>) -> Result<Config> {
    let config_path = Config::get_config_path(config_path_opt);

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run 'waymark init' to create one.",
            config_path.display()
        );
    }

    Config::load_from_file(&config_path)
}
