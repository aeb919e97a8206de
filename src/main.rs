use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use hotbar_store::catalog::{CatalogLookup, EmptyCatalog, StaticCatalog};
use hotbar_store::models::{CreateHotbarInput, Direction, EntityReference};
use hotbar_store::render::{render_hotbar, render_hotbar_list};
use hotbar_store::{HotbarStore, StoreConfig};

#[derive(Parser)]
#[command(name = "hotbar")]
#[command(about = "Inspect and edit a hotbar store file")]
struct Cli {
    /// Store file (default: $HOTBAR_STORE_PATH or the user data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// JSON array of catalog items used to validate and enrich references
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Slots per hotbar
    #[arg(long, global = true)]
    capacity: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active hotbar
    Show,
    /// List all hotbars
    List,
    /// Create a hotbar
    AddHotbar {
        name: String,
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Remove a hotbar
    RemoveHotbar { id: Uuid },
    /// Rename a hotbar
    Rename { id: Uuid, name: String },
    /// Make a hotbar active
    Activate { id: Uuid },
    /// Activate the next hotbar
    Next,
    /// Activate the previous hotbar
    Previous,
    /// Pin an entity to the active hotbar
    Pin {
        uid: String,
        /// Display name (default: the catalog's name for the uid)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// Preferred slot (1-based)
        #[arg(long, allow_negative_numbers = true, conflicts_with = "near")]
        slot: Option<i64>,
        /// Take the empty slot closest to this one (1-based)
        #[arg(long, allow_negative_numbers = true)]
        near: Option<i64>,
        /// With --near, search towards the first slot instead of the last
        #[arg(long, requires = "near")]
        backward: bool,
    },
    /// Unpin an entity from the active hotbar
    Unpin { uid: String },
    /// Move a slot's occupant to another slot (1-based), swapping if occupied
    Restack {
        #[arg(allow_negative_numbers = true)]
        from: i64,
        #[arg(allow_negative_numbers = true)]
        to: i64,
    },
    /// Migrate the store file and refresh cached entity names
    Migrate,
}

/// Initialize tracing on stderr so command output stays on stdout.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "hotbar_store=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = StoreConfig::from_env()?;
    if let Some(path) = cli.store {
        config.path = path;
    }
    if let Some(capacity) = cli.capacity {
        config = config.with_capacity(capacity);
    }

    let catalog: Arc<dyn CatalogLookup> = match &cli.catalog {
        Some(path) => Arc::new(StaticCatalog::from_path(path)?),
        None => Arc::new(EmptyCatalog),
    };

    let mut store = HotbarStore::open(config, Arc::clone(&catalog));

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => print!("{}", render_hotbar(store.active_hotbar())),
        Commands::List => print!(
            "{}",
            render_hotbar_list(store.hotbars(), store.active_hotbar_index())
        ),
        Commands::AddHotbar { name, id } => {
            let id = store.add_hotbar(CreateHotbarInput { name, id })?;
            println!("{id}");
        }
        Commands::RemoveHotbar { id } => {
            if !store.remove_hotbar(id)? {
                anyhow::bail!("No hotbar with id {id}");
            }
        }
        Commands::Rename { id, name } => {
            if !store.rename_hotbar(id, name) {
                anyhow::bail!("No hotbar with id {id}");
            }
        }
        Commands::Activate { id } => {
            if !store.set_active_hotbar(id) {
                anyhow::bail!("No hotbar with id {id}");
            }
        }
        Commands::Next => println!("{}", store.switch_to_next()),
        Commands::Previous => println!("{}", store.switch_to_previous()),
        Commands::Pin {
            uid,
            name,
            source,
            slot,
            near,
            backward,
        } => {
            let known = catalog.find_by_uid(&uid);
            let entity = EntityReference {
                name: name.or_else(|| known.as_ref().and_then(|e| e.name.clone())),
                source: source.or_else(|| known.and_then(|e| e.source)),
                uid,
            };
            let placed = match near {
                Some(near) => {
                    let direction = if backward {
                        Direction::Backward
                    } else {
                        Direction::Forward
                    };
                    store.add_to_hotbar_near(&entity, near - 1, direction)?
                }
                None => store.add_to_hotbar(&entity, slot.map(|s| s - 1))?,
            };
            match placed {
                Some(index) => println!("Pinned {} to slot {}", entity.uid, index + 1),
                None => anyhow::bail!("Hotbar is full"),
            }
        }
        Commands::Unpin { uid } => {
            if !store.remove_from_hotbar(&uid) {
                println!("{uid} is not pinned to the active hotbar");
            }
        }
        Commands::Restack { from, to } => store.restack_items(from - 1, to - 1)?,
        Commands::Migrate => {
            let report = store.last_load().clone();
            let refreshed = store.refresh_from_catalog();
            store.save().context("Failed to write store file")?;
            println!(
                "{} at version {} (applied: {}; refreshed {} reference(s))",
                store.path().display(),
                report.migration.version,
                if report.migration.applied.is_empty() {
                    "none".to_string()
                } else {
                    report.migration.applied.join(", ")
                },
                refreshed
            );
        }
    }

    store.flush();
    Ok(())
}
