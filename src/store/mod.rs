//! The hotbar store.
//!
//! [`HotbarStore`] owns every hotbar, the active selection, and the store
//! file. Loading reads the raw document, runs it through the migration
//! pipeline, and materializes the hotbars. Every accepted mutation updates
//! the in-memory model immediately and schedules a write of the full
//! document; write failures are logged, never returned, and never roll
//! back in-memory state.

mod file;
pub mod instance;
mod migrations;
mod version;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::de::Error as _;
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::CatalogLookup;
use crate::config::{PersistMode, StoreConfig};
use crate::error::{Result, StoreError};
use crate::models::*;

pub use file::StoreFile;
pub use instance::{create_instance, get_instance, reset_instance, SharedStore};
pub use migrations::{run_migrations, MigrationContext, MigrationReport, CURRENT_VERSION};
pub use version::{SchemaVersion, VersionParseError};

/// Where the loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// An existing, readable store file.
    Existing,
    /// No store file existed; a default document was created.
    Created,
    /// The store file was unreadable; a default document replaced it.
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub migration: MigrationReport,
}

pub struct HotbarStore {
    config: StoreConfig,
    catalog: Arc<dyn CatalogLookup>,
    file: StoreFile,
    hotbars: Vec<Hotbar>,
    active_hotbar_id: Uuid,
    version: String,
    dirty: bool,
    last_load: LoadReport,
}

impl HotbarStore {
    /// Create a store for `config` and load its document.
    pub fn open(config: StoreConfig, catalog: Arc<dyn CatalogLookup>) -> Self {
        let hotbar = default_hotbar(&config);
        let mut store = Self {
            file: StoreFile::new(config.path.clone()),
            active_hotbar_id: hotbar.id(),
            hotbars: vec![hotbar],
            version: CURRENT_VERSION.to_string(),
            dirty: false,
            last_load: fresh_report(LoadSource::Created),
            config,
            catalog,
        };
        store.load();
        store
    }

    /// (Re)load the document from disk.
    ///
    /// A missing file yields a default document. A file that cannot be read,
    /// parsed, or materialized is treated the same way, after copying it
    /// aside. Fresh, recovered, and migrated documents are written back.
    pub fn load(&mut self) -> LoadReport {
        let (source, loaded) = match self.file.read() {
            Ok(Some(content)) => match self.parse_and_migrate(&content) {
                Ok(loaded) => (LoadSource::Existing, Some(loaded)),
                Err(e) => {
                    tracing::warn!(
                        path = %self.file.path().display(),
                        "Hotbar store document is unreadable, starting fresh: {e}"
                    );
                    match self.file.back_up_corrupt() {
                        Ok(backup) => tracing::info!(
                            backup = %backup.display(),
                            "Kept a copy of the unreadable hotbar store"
                        ),
                        Err(e) => tracing::warn!("Failed to back up unreadable hotbar store: {e}"),
                    }
                    (LoadSource::Recovered, None)
                }
            },
            Ok(None) => (LoadSource::Created, None),
            Err(e) => {
                tracing::error!(
                    path = %self.file.path().display(),
                    "Failed to read hotbar store, starting fresh: {e}"
                );
                (LoadSource::Recovered, None)
            }
        };

        let (document, migration) = match loaded {
            Some(loaded) => loaded,
            None => {
                let hotbar = default_hotbar(&self.config);
                let id = hotbar.id();
                (
                    StoreDocument::new(CURRENT_VERSION, vec![hotbar], id),
                    fresh_report(source).migration,
                )
            }
        };

        let repaired = self.apply_document(document);
        self.dirty = false;
        if source != LoadSource::Existing || !migration.applied.is_empty() || repaired {
            self.write_logged();
        }

        let report = LoadReport { source, migration };
        tracing::debug!(
            source = ?report.source,
            applied = ?report.migration.applied,
            hotbars = self.hotbars.len(),
            "Loaded hotbar store"
        );
        self.last_load = report.clone();
        report
    }

    fn parse_and_migrate(&self, content: &str) -> Result<(StoreDocument, MigrationReport)> {
        let Value::Object(raw) = serde_json::from_str::<Value>(content)? else {
            return Err(serde_json::Error::custom("store document is not a JSON object").into());
        };

        let ctx = MigrationContext {
            catalog: self.catalog.as_ref(),
            capacity: self.config.capacity,
            default_hotbar_name: &self.config.default_hotbar_name,
            bootstrap_entity: self.config.bootstrap_entity.as_ref(),
        };
        let (migrated, report) = run_migrations(raw, &ctx);
        let document = serde_json::from_value(Value::Object(migrated))?;
        Ok((document, report))
    }

    /// Install a document as the in-memory state, enforcing the collection
    /// invariants. Returns whether anything had to be repaired.
    fn apply_document(&mut self, document: StoreDocument) -> bool {
        let StoreDocument {
            internal,
            mut hotbars,
            active_hotbar_id,
        } = document;
        let mut repaired = false;

        for hotbar in &mut hotbars {
            for entity in hotbar.fit_to_capacity(self.config.capacity) {
                tracing::warn!(
                    entity_id = %entity.uid,
                    hotbar_id = %hotbar.id(),
                    "dropping pinned entity beyond hotbar capacity"
                );
                repaired = true;
            }
        }

        let mut seen = HashSet::new();
        for (index, hotbar) in hotbars.iter_mut().enumerate() {
            if seen.insert(hotbar.id()) {
                continue;
            }
            let id = migrations::derived_id(&format!("{index}:{}", hotbar.id()));
            tracing::warn!(
                hotbar_id = %hotbar.id(),
                new_id = %id,
                "hotbar id is already taken, assigning a derived id"
            );
            hotbar.reassign_id(id);
            seen.insert(id);
            repaired = true;
        }

        if hotbars.is_empty() {
            hotbars.push(default_hotbar(&self.config));
            repaired = true;
        }

        self.active_hotbar_id = if hotbars.iter().any(|h| h.id() == active_hotbar_id) {
            active_hotbar_id
        } else {
            tracing::warn!(
                hotbar_id = %active_hotbar_id,
                "active hotbar does not exist, activating the first"
            );
            repaired = true;
            hotbars[0].id()
        };
        self.hotbars = hotbars;
        self.version = internal.migrations.version;
        repaired
    }

    // ============================================================
    // Hotbar operations
    // ============================================================

    /// Append a new, all-empty hotbar. The active selection is unchanged.
    pub fn add_hotbar(&mut self, input: CreateHotbarInput) -> Result<Uuid> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        if self.get_by_id(id).is_some() {
            return Err(StoreError::DuplicateHotbar(id));
        }

        self.hotbars
            .push(Hotbar::new(id, input.name, self.config.capacity));
        tracing::info!(hotbar_id = %id, "Added hotbar");
        self.schedule_save();
        Ok(id)
    }

    /// Remove a hotbar.
    ///
    /// The last remaining hotbar and configured protected hotbars cannot be
    /// removed. An unknown id is logged and reported as `Ok(false)`. Removing
    /// the active hotbar activates the first remaining one.
    pub fn remove_hotbar(&mut self, id: Uuid) -> Result<bool> {
        let Some(position) = self.position_of(id) else {
            tracing::warn!(hotbar_id = %id, "cannot remove unknown hotbar");
            return Ok(false);
        };
        if self.hotbars.len() <= 1 {
            return Err(StoreError::LastHotbar);
        }
        if self.config.is_protected(id) {
            return Err(StoreError::ProtectedHotbar(id));
        }

        self.hotbars.remove(position);
        if self.active_hotbar_id == id {
            self.active_hotbar_id = self.hotbars[0].id();
        }
        tracing::info!(hotbar_id = %id, "Removed hotbar");
        self.schedule_save();
        Ok(true)
    }

    pub fn rename_hotbar(&mut self, id: Uuid, name: impl Into<String>) -> bool {
        let Some(position) = self.position_of(id) else {
            tracing::warn!(hotbar_id = %id, "cannot rename unknown hotbar");
            return false;
        };
        self.hotbars[position].rename(name);
        self.schedule_save();
        true
    }

    /// Activate a hotbar. An unknown id is logged and ignored.
    pub fn set_active_hotbar(&mut self, id: Uuid) -> bool {
        if self.position_of(id).is_none() {
            tracing::warn!(hotbar_id = %id, "cannot activate unknown hotbar");
            return false;
        }
        if self.active_hotbar_id != id {
            self.active_hotbar_id = id;
            self.schedule_save();
        }
        true
    }

    /// Activate the next hotbar, wrapping around after the last.
    pub fn switch_to_next(&mut self) -> Uuid {
        let next = (self.active_hotbar_index() + 1) % self.hotbars.len();
        self.set_active_hotbar(self.hotbars[next].id());
        self.active_hotbar_id
    }

    /// Activate the previous hotbar, wrapping around before the first.
    pub fn switch_to_previous(&mut self) -> Uuid {
        let len = self.hotbars.len();
        let previous = (self.active_hotbar_index() + len - 1) % len;
        self.set_active_hotbar(self.hotbars[previous].id());
        self.active_hotbar_id
    }

    // ============================================================
    // Active hotbar slot operations
    // ============================================================

    /// Pin an entity to the active hotbar.
    ///
    /// The entity must have a non-empty string uid and a string name,
    /// otherwise [`StoreError::InvalidEntity`] is returned. An out-of-range
    /// `index` is logged and the entity takes the first empty cell. Returns
    /// the index the entity occupies, or `None` if the hotbar is full.
    pub fn add_to_hotbar<E: CatalogEntity + ?Sized>(
        &mut self,
        entity: &E,
        index: Option<i64>,
    ) -> Result<Option<usize>> {
        let reference = EntityReference::from_entity(entity)?;
        let before = self.active_hotbar().slots().clone();
        let placed = self.active_hotbar_mut().add_entity(reference, index);

        if self.active_hotbar().slots() != &before {
            self.schedule_save();
        }
        Ok(placed)
    }

    /// Pin an entity to the active hotbar's empty slot closest to `anchor`
    /// in `direction`, with the same validation as [`Self::add_to_hotbar`].
    pub fn add_to_hotbar_near<E: CatalogEntity + ?Sized>(
        &mut self,
        entity: &E,
        anchor: i64,
        direction: Direction,
    ) -> Result<Option<usize>> {
        let reference = EntityReference::from_entity(entity)?;
        let before = self.active_hotbar().slots().clone();
        let placed = self
            .active_hotbar_mut()
            .add_entity_near(reference, anchor, direction);

        if self.active_hotbar().slots() != &before {
            self.schedule_save();
        }
        Ok(placed)
    }

    /// Unpin an entity from the active hotbar. Unknown uids are a no-op.
    pub fn remove_from_hotbar(&mut self, uid: &str) -> bool {
        let removed = self.active_hotbar_mut().remove_entity(uid);
        if removed {
            self.schedule_save();
        }
        removed
    }

    /// Move the occupant of slot `from` to slot `to` on the active hotbar,
    /// swapping with an occupied target.
    pub fn restack_items(&mut self, from: i64, to: i64) -> Result<()> {
        self.active_hotbar_mut().move_entity(from, to)?;
        if from != to {
            self.schedule_save();
        }
        Ok(())
    }

    pub fn is_added_to_active<E: CatalogEntity + ?Sized>(&self, entity: &E) -> bool {
        entity
            .uid()
            .is_some_and(|uid| self.active_hotbar().contains(uid))
    }

    /// Refresh cached names and sources of every pinned entity the catalog
    /// knows. Entities the catalog does not know are left alone.
    pub fn refresh_from_catalog(&mut self) -> usize {
        let catalog = Arc::clone(&self.catalog);
        let changed: usize = self
            .hotbars
            .iter_mut()
            .map(|hotbar| hotbar.refresh_references(|uid| catalog.find_by_uid(uid)))
            .sum();
        if changed > 0 {
            self.schedule_save();
        }
        changed
    }

    // ============================================================
    // Read projections
    // ============================================================

    pub fn hotbars(&self) -> &[Hotbar] {
        &self.hotbars
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<&Hotbar> {
        self.hotbars.iter().find(|hotbar| hotbar.id() == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Hotbar> {
        self.hotbars.iter().find(|hotbar| hotbar.name() == name)
    }

    pub fn active_hotbar_id(&self) -> Uuid {
        self.active_hotbar_id
    }

    /// Position of the active hotbar in the collection.
    pub fn active_hotbar_index(&self) -> usize {
        self.position_of(self.active_hotbar_id).unwrap_or(0)
    }

    pub fn active_hotbar(&self) -> &Hotbar {
        &self.hotbars[self.active_hotbar_index()]
    }

    fn active_hotbar_mut(&mut self) -> &mut Hotbar {
        let index = self.active_hotbar_index();
        &mut self.hotbars[index]
    }

    fn position_of(&self, id: Uuid) -> Option<usize> {
        self.hotbars.iter().position(|hotbar| hotbar.id() == id)
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn schema_version(&self) -> &str {
        &self.version
    }

    pub fn last_load(&self) -> &LoadReport {
        &self.last_load
    }

    /// Snapshot of the full persisted document.
    pub fn document(&self) -> StoreDocument {
        StoreDocument::new(
            self.version.clone(),
            self.hotbars.clone(),
            self.active_hotbar_id,
        )
    }

    // ============================================================
    // Persistence
    // ============================================================

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the document now, returning any I/O failure.
    pub fn save(&mut self) -> Result<()> {
        self.file.write(&self.document())?;
        self.dirty = false;
        Ok(())
    }

    /// Write the document if a deferred write is pending.
    pub fn flush(&mut self) {
        if self.dirty {
            self.write_logged();
        }
    }

    fn schedule_save(&mut self) {
        match self.config.persist {
            PersistMode::Immediate => self.write_logged(),
            PersistMode::Deferred => self.dirty = true,
        }
    }

    fn write_logged(&mut self) {
        if let Err(e) = self.save() {
            tracing::error!(
                path = %self.file.path().display(),
                "Failed to persist hotbar store: {e}"
            );
            self.dirty = true;
        }
    }
}

impl Drop for HotbarStore {
    fn drop(&mut self) {
        self.flush();
    }
}

fn default_hotbar(config: &StoreConfig) -> Hotbar {
    let mut hotbar = Hotbar::new(
        Uuid::new_v4(),
        config.default_hotbar_name.clone(),
        config.capacity,
    );
    if let Some(entity) = &config.bootstrap_entity {
        hotbar.add_entity(entity.clone(), Some(0));
    }
    hotbar
}

fn fresh_report(source: LoadSource) -> LoadReport {
    LoadReport {
        source,
        migration: MigrationReport {
            recorded_version: None,
            applied: Vec::new(),
            version: CURRENT_VERSION.to_string(),
        },
    }
}
