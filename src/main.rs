//! Locapps CLI - Per-app location access tracking

use clap::{Args, Parser, Subcommand};
use locapps::config::{self, LocappsConfig};
use locapps::inventory::{AdbInventory, PackageInventory, SnapshotInventory};
use locapps::ui::{self, Icons, TerminalShell};
use locapps::{Lifecycle, LocationAccessType, LocationAppsDb, LocationAppsScreen, RefreshOutcome, UpsertOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "locapps")]
#[command(version)]
#[command(about = "Track which class of location access each installed app gets")]
#[command(long_about = r#"
Locapps keeps one location access classification per installed app
(no_location, fixed_location, coarse_location, fine_location) and lists
installed apps with their classification and granted location permissions.

Example usage:
  locapps init --snapshot packages.json
  locapps show --adb --serial emulator-5554
  locapps set com.example.maps coarse
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read installed packages from a JSON snapshot
    #[arg(long, conflicts_with = "adb")]
    snapshot: Option<PathBuf>,

    /// Read installed packages from a device over adb
    #[arg(long)]
    adb: bool,

    /// Device serial passed to adb (implies --adb)
    #[arg(long)]
    serial: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        #[command(flatten)]
        source: SourceArgs,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Record every location-requesting package not yet tracked
    Populate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List installed location apps with classification and grants
    Show {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List stored records by package name
    List,

    /// Set the classification of a package
    Set {
        /// Package name
        package: String,

        /// no_location, fixed_location, coarse_location or fine_location
        access: String,
    },

    /// Show record counts per classification
    Stats,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

fn emit_json(data: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn resolve_database(cli_database: Option<PathBuf>, config: &LocappsConfig) -> PathBuf {
    cli_database
        .or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".locapps")))
}

fn resolve_inventory(source: &SourceArgs, config: &LocappsConfig) -> anyhow::Result<Arc<dyn PackageInventory>> {
    if let Some(path) = &source.snapshot {
        return Ok(Arc::new(SnapshotInventory::load(path)?));
    }

    let use_adb = source.adb || source.serial.is_some();
    if !use_adb {
        if let Some(path) = &config.snapshot {
            return Ok(Arc::new(SnapshotInventory::load(Path::new(path))?));
        }
    }
    if use_adb || config.uses_adb() {
        let mut adb = AdbInventory::new();
        if let Some(bin) = &config.adb_bin {
            adb = adb.with_bin(bin.clone());
        }
        if let Some(serial) = source.serial.clone().or_else(|| config.adb_serial.clone()) {
            adb = adb.with_serial(serial);
        }
        return Ok(Arc::new(adb));
    }

    anyhow::bail!("no package source: pass --snapshot <file> or --adb, or set one in locapps.toml")
}

/// Config written by `init`: the chosen source replaces any previous one
fn init_config(source: SourceArgs, database: &Path, previous: LocappsConfig) -> LocappsConfig {
    let adb = source.adb || source.serial.is_some();
    LocappsConfig {
        database: Some(database.display().to_string()),
        snapshot: source.snapshot.map(|p| p.display().to_string()),
        adb,
        adb_serial: source.serial,
        adb_bin: previous.adb_bin,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = resolve_database(cli.database, &config);

    match cli.command {
        Commands::Init { source, force } => {
            let config_path = cli.config.unwrap_or_else(config::default_config_path);
            let new_config = init_config(source, &database, config);
            config::write_config(&config_path, &new_config, force)?;
            LocationAppsDb::open(&database)?;

            if output_mode.is_human() {
                ui::success(&format!("Wrote {}", config_path.display()));
                ui::info("Database", &database.display().to_string());
            } else {
                emit_json(&new_config)?;
            }
        }

        Commands::Populate { source } => {
            let inventory = resolve_inventory(&source, &config)?;
            let db = LocationAppsDb::open(&database)?;
            tracing::info!("Populating {:?}", database);

            let screen = LocationAppsScreen::start(db, inventory);
            let summary = screen.wait_populated().await?.summary;

            if output_mode.is_human() {
                ui::header("Population pass");
                ui::summary_row("Installed packages:", &summary.packages.to_string());
                ui::summary_row("Requesting location:", &summary.location_packages.to_string());
                ui::summary_row("Newly recorded:", &summary.newly_recorded.to_string());
            } else {
                emit_json(&serde_json::json!({
                    "packages": summary.packages,
                    "location_packages": summary.location_packages,
                    "newly_recorded": summary.newly_recorded,
                }))?;
            }
        }

        Commands::Show { source } => {
            let inventory = resolve_inventory(&source, &config)?;
            let db = LocationAppsDb::open(&database)?;

            let screen = LocationAppsScreen::start(db, inventory);
            let lifecycle = Lifecycle::new();
            lifecycle.resume();

            let mut shell = TerminalShell::new();
            let outcome = tokio::select! {
                outcome = screen.refresh(&mut shell, &lifecycle) => outcome?,
                _ = tokio::signal::ctrl_c() => {
                    lifecycle.pause();
                    RefreshOutcome::Abandoned
                }
            };

            match outcome {
                RefreshOutcome::Rendered { items } if output_mode.is_human() => {
                    ui::header(&format!("Location apps ({})", items));
                    println!("{}", ui::items_table(shell.items()));
                }
                RefreshOutcome::Rendered { .. } => emit_json(&shell.items())?,
                RefreshOutcome::Abandoned => ui::warn("Interrupted, listing discarded"),
            }
            lifecycle.destroy();
        }

        Commands::List => {
            let db = LocationAppsDb::open(&database)?;
            let records = db.list_apps_by_package_name()?;

            if !output_mode.is_human() {
                emit_json(&records)?;
            } else if records.is_empty() {
                println!("∅ No apps recorded.");
            } else {
                for record in records {
                    println!("{} {} [{}]", ui::access_icon(record.access_type), record.package_name, record.access_type);
                }
            }
        }

        Commands::Set { package, access } => {
            let access_type: LocationAccessType = access.parse()?;
            let db = LocationAppsDb::open(&database)?;
            let outcome = db.insert_or_update(&package, access_type)?;

            if output_mode.is_human() {
                let verb = match outcome {
                    UpsertOutcome::Inserted => "Recorded",
                    UpsertOutcome::Updated => "Updated",
                };
                ui::success(&format!("{} {} as {}", verb, package, access_type));
            } else {
                emit_json(&serde_json::json!({
                    "package": package,
                    "access_type": access_type,
                    "inserted": outcome == UpsertOutcome::Inserted,
                }))?;
            }
        }

        Commands::Stats => {
            let db = LocationAppsDb::open(&database)?;
            let stats = db.stats()?;

            if output_mode.is_human() {
                println!("{} Locapps Statistics ({:?})", Icons::STATS, database);
                ui::section("Records");
                println!("{}", ui::stats_table(&stats));
            } else {
                emit_json(&stats)?;
            }
        }
    }

    Ok(())
}
