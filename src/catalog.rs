//! Read-only access to the live entity catalog.
//!
//! The store never manages catalog entities; it only asks whether a uid is
//! known and what its current display metadata is. Lookups are synchronous
//! and side-effect free.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{CatalogEntity, EntityReference};

/// Lookup contract the store consumes.
pub trait CatalogLookup: Send + Sync {
    /// Current reference for `uid`, or `None` if the catalog does not know it.
    fn find_by_uid(&self, uid: &str) -> Option<EntityReference>;
}

/// A catalog that knows no entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl CatalogLookup for EmptyCatalog {
    fn find_by_uid(&self, _uid: &str) -> Option<EntityReference> {
        None
    }
}

/// Metadata of a catalog item, as the catalog serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// A catalog item: `{ "metadata": { "uid", "name", "source" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub metadata: CatalogMetadata,
}

impl CatalogItem {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, source: Option<&str>) -> Self {
        Self {
            metadata: CatalogMetadata {
                uid: uid.into(),
                name: name.into(),
                source: source.map(str::to_string),
            },
        }
    }
}

impl CatalogEntity for CatalogItem {
    fn uid(&self) -> Option<&str> {
        Some(&self.metadata.uid)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.metadata.name)
    }

    fn source(&self) -> Option<&str> {
        self.metadata.source.as_deref()
    }
}

/// In-memory snapshot of a catalog, keyed by uid.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, EntityReference>,
}

impl StaticCatalog {
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let entries = items
            .into_iter()
            .map(|item| {
                let CatalogMetadata { uid, name, source } = item.metadata;
                (uid.clone(), EntityReference::new(uid, name, source))
            })
            .collect();
        Self { entries }
    }

    /// Parse a JSON array of catalog items.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<CatalogItem> =
            serde_json::from_str(json).context("Failed to parse catalog items")?;
        Ok(Self::new(items))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogLookup for StaticCatalog {
    fn find_by_uid(&self, uid: &str) -> Option<EntityReference> {
        self.entries.get(uid).cloned()
    }
}
