//! Store configuration.
//!
//! Configuration can be built in code or loaded from environment variables:
//! - `HOTBAR_STORE_PATH` - Path of the store file (default: `<data dir>/hotbar-store.json`)
//! - `HOTBAR_STORE_CAPACITY` - Slots per hotbar (default: 12)
//! - `HOTBAR_STORE_PERSIST` - `immediate` or `deferred` (default: `immediate`)

use std::path::{Path, PathBuf};

use anyhow::Result;
use uuid::Uuid;

use crate::models::EntityReference;

pub const DEFAULT_CAPACITY: usize = 12;
pub const DEFAULT_HOTBAR_NAME: &str = "default";
const STORE_FILE: &str = "hotbar-store.json";

/// When the store writes its document after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Write the full document after every accepted mutation.
    #[default]
    Immediate,
    /// Mark the store dirty; write on `flush()` or when the store is dropped.
    Deferred,
}

impl PersistMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Some(Self::Immediate),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Location of the store file.
    pub path: PathBuf,
    /// Number of slots every hotbar holds.
    pub capacity: usize,
    /// Name of the hotbar created when no document exists.
    pub default_hotbar_name: String,
    /// Entity pinned at slot 0 of a freshly created default hotbar.
    pub bootstrap_entity: Option<EntityReference>,
    /// Hotbars that `remove_hotbar` refuses to delete.
    pub protected_hotbars: Vec<Uuid>,
    pub persist: PersistMode,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
            default_hotbar_name: DEFAULT_HOTBAR_NAME.to_string(),
            bootstrap_entity: None,
            protected_hotbars: Vec::new(),
            persist: PersistMode::default(),
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let path = match std::env::var("HOTBAR_STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_path()?,
        };

        let capacity = std::env::var("HOTBAR_STORE_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&c| c > 0)
            .unwrap_or(DEFAULT_CAPACITY);

        let persist = std::env::var("HOTBAR_STORE_PERSIST")
            .ok()
            .and_then(|s| PersistMode::from_str(&s))
            .unwrap_or_default();

        Ok(Self::new(path).with_capacity(capacity).with_persist(persist))
    }

    /// Slot count per hotbar. A capacity of zero is raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_default_hotbar_name(mut self, name: impl Into<String>) -> Self {
        self.default_hotbar_name = name.into();
        self
    }

    pub fn with_bootstrap_entity(mut self, entity: EntityReference) -> Self {
        self.bootstrap_entity = Some(entity);
        self
    }

    pub fn with_protected_hotbar(mut self, id: Uuid) -> Self {
        self.protected_hotbars.push(id);
        self
    }

    pub fn with_persist(mut self, persist: PersistMode) -> Self {
        self.persist = persist;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_protected(&self, id: Uuid) -> bool {
        self.protected_hotbars.contains(&id)
    }
}

/// Default store file inside the user's data directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "hotbar-store")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join(STORE_FILE))
}
