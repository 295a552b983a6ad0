use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use study_core::catalog;
use study_core::config::AppConfig;
use study_core::db::SqliteStore;
use study_core::filter::{FilterState, ListFilter};
use study_core::geo::{Coordinate, nearby};
use study_core::notify::NotificationState;
use study_core::rating::{color_for, rating_label};
use study_core::repository::LocationRepository;
use study_core::schema::StoredLocation;
use study_core::seed::{CommentTimestamps, SeedOptions, seed};

#[derive(Parser)]
#[command(name = "studyon")]
#[command(about = "StudyOn study location CLI", long_about = None)]
struct Cli {
    /// Config file (default: ./studyon.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert a catalog of locations into the store, keyed by name
    Seed {
        /// YAML catalog (default: built-in London sample)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Comment date policy, overrides the config file
        #[arg(long, value_enum)]
        comment_timestamps: Option<TimestampArg>,
    },
    /// List locations passing the filter, in store order
    List {
        /// `library`, `cafe`, any other category, or `fav`
        #[arg(long)]
        filter: Option<String>,

        /// Case-insensitive substring of the location name
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Locations around a position, nearest first
    Nearby {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Search radius in meters (default: notify radius from config)
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Manage favorite locations
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// Markdown guide of all locations
    Guide {
        #[command(subcommand)]
        command: GuideCommands,
    },
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Mark a location id as favorite
    Add { id: String },
    /// Unmark a location id
    Remove { id: String },
    /// Show favorite locations
    List,
}

#[derive(Subcommand)]
enum GuideCommands {
    /// Write the guide vault
    Build {
        /// Output directory (default: ./guide)
        #[arg(long, default_value = "guide")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TimestampArg {
    Preserve,
    SeedTime,
}

impl From<TimestampArg> for CommentTimestamps {
    fn from(value: TimestampArg) -> Self {
        match value {
            TimestampArg::Preserve => CommentTimestamps::Preserve,
            TimestampArg::SeedTime => CommentTimestamps::SeedTime,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("studyon error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = AppConfig::load(cli.config.as_deref())?;
    let db_path = cli.db.clone().unwrap_or_else(|| config.database.path.clone());

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
        Commands::Seed {
            catalog,
            comment_timestamps,
        } => {
            let options = SeedOptions {
                comment_timestamps: comment_timestamps
                    .map(CommentTimestamps::from)
                    .unwrap_or(config.seed.comment_timestamps),
            };
            seed_command(&db_path, catalog.as_deref(), options).await
        }
        Commands::List { filter, search } => list_command(&db_path, filter, search),
        Commands::Nearby { lat, lon, radius } => {
            let center = match (lat, lon) {
                (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
                _ => config.map.center(),
            };
            nearby_command(&db_path, center, radius.unwrap_or(config.map.notify_radius_m))
        }
        Commands::Favorite { command } => favorite_command(&db_path, command),
        Commands::Guide { command } => match command {
            GuideCommands::Build { out_dir } => {
                let store = SqliteStore::open(&db_path)?;
                guide::build_guide(&store.query_all()?, &store.favorites()?, &out_dir)?;
                println!("Wrote guide to {}", out_dir.display());
                Ok(())
            }
        },
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("STUDYON_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}

async fn seed_command(db_path: &Path, catalog_path: Option<&Path>, options: SeedOptions) -> Result<()> {
    let locations = match catalog_path {
        Some(path) => catalog::load_from_path(path)?,
        None => catalog::sample()?,
    };
    let store = Arc::new(SqliteStore::open(db_path)?);

    let report = seed(Arc::clone(&store), locations, options)
        .await
        .context("seeding study locations")?;

    println!(
        "Seeded {} locations: {} added, {} updated, {} failed",
        report.attempted(),
        report.inserted,
        report.merged,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.name, failure.error);
    }
    Ok(())
}

fn list_command(db_path: &Path, filter: Option<String>, search: String) -> Result<()> {
    let store = SqliteStore::open(db_path)?;
    let records = store.query_all()?;
    let state = FilterState {
        selected: filter.as_deref().map(ListFilter::from),
        search_text: search,
        favorites: store.favorites()?,
    };

    let visible = state.visible(&records);
    for record in &visible {
        print_row(record, None);
    }
    if visible.is_empty() {
        println!("No study locations match.");
    }
    Ok(())
}

fn nearby_command(db_path: &Path, center: Coordinate, radius_m: f64) -> Result<()> {
    if !(radius_m.is_finite() && radius_m > 0.0) {
        bail!("radius must be a positive number of meters, got {radius_m}");
    }
    let store = SqliteStore::open(db_path)?;
    let records = store.query_all()?;

    let hits = nearby(&records, &center, radius_m);
    if hits.is_empty() {
        println!("No study locations within {radius_m:.0} m.");
        return Ok(());
    }
    for (record, distance) in &hits {
        print_row(record, Some(*distance));
    }

    let mut notifications = NotificationState::new();
    if let Some(record) = notifications.observe_position(&center, &records, radius_m) {
        println!("Notify: {} is nearby", record.location.name);
    }
    Ok(())
}

fn favorite_command(db_path: &Path, command: FavoriteCommands) -> Result<()> {
    let store = SqliteStore::open(db_path)?;
    match command {
        FavoriteCommands::Add { id } => {
            let Some(record) = store.get(&id)? else {
                bail!("no study location with id {id}");
            };
            if store.add_favorite(&id)? {
                println!("Added {} to favorites", record.location.name);
            } else {
                println!("{} is already a favorite", record.location.name);
            }
        }
        FavoriteCommands::Remove { id } => {
            if store.remove_favorite(&id)? {
                println!("Removed {id} from favorites");
            } else {
                println!("{id} was not a favorite");
            }
        }
        FavoriteCommands::List => {
            let records = store.query_all()?;
            let state = FilterState {
                selected: Some(ListFilter::Favorites),
                favorites: store.favorites()?,
                ..FilterState::default()
            };
            let visible = state.visible(&records);
            for record in &visible {
                print_row(record, None);
            }
            if visible.is_empty() {
                println!("No favorites yet.");
            }
        }
    }
    Ok(())
}

fn print_row(record: &StoredLocation, distance_m: Option<f64>) {
    let l = &record.location;
    let mut line = format!(
        "{}  {}  {:<7} {} {}",
        record.id,
        color_for(l.rating).hex(),
        l.category.as_str(),
        rating_label(l.rating),
        l.name
    );
    if let Some(distance) = distance_m {
        line.push_str(&format!("  ({distance:.0} m)"));
    }
    if let (Some(crowdedness), Some(noise)) = (l.env_factors.crowdedness(), l.env_factors.noise()) {
        line.push_str(&format!(
            "  [crowdedness {} | noise {}]",
            rating_label(crowdedness),
            rating_label(noise)
        ));
    }
    println!("{line}");
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    // Export StudyLocation schema
    let location_schema = schema_for!(study_core::schema::StudyLocation);
    let location_json = serde_json::to_string_pretty(&location_schema)?;
    fs::write(out_dir.join("StudyLocation.schema.json"), location_json)?;

    // Export StoredLocation schema
    let stored_schema = schema_for!(study_core::schema::StoredLocation);
    let stored_json = serde_json::to_string_pretty(&stored_schema)?;
    fs::write(out_dir.join("StoredLocation.schema.json"), stored_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
