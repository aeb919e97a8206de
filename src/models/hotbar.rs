use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::EntityReference;
use super::slot::{Direction, Slot, Slots};
use crate::error::Result;

/// A named, fixed-capacity row of pinned catalog entities.
///
/// The `id` never changes once created. The name is user-mutable and need
/// not be unique. Slots are persisted under `items`, the key historical
/// store files use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotbar {
    id: Uuid,
    name: String,
    #[serde(rename = "items")]
    slots: Slots,
}

/// Input for creating a new hotbar. A fresh id is generated when `id` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHotbarInput {
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
}

impl CreateHotbarInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

impl Hotbar {
    pub fn new(id: Uuid, name: impl Into<String>, capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            slots: Slots::new(capacity),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn reassign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Label used by hotbar pickers, e.g. `"2: Work"`.
    pub fn display_label(&self, position: usize) -> String {
        format!("{}: {}", position + 1, self.name)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.slots.index_of(uid).is_some()
    }

    pub fn index_of(&self, uid: &str) -> Option<usize> {
        self.slots.index_of(uid)
    }

    /// Pin an entity, returning the index it occupies.
    ///
    /// A valid, empty `preferred_index` is honored. An out-of-range index or
    /// one held by a different entity is logged and the entity goes to the
    /// first empty slot instead. An entity already pinned stays where it is.
    /// Returns `None` when the hotbar is full; that limit is communicated by
    /// the UI, not raised as an error.
    pub fn add_entity(
        &mut self,
        reference: EntityReference,
        preferred_index: Option<i64>,
    ) -> Option<usize> {
        let preferred = preferred_index.and_then(|index| match self.slots.checked_index(index) {
            Ok(index) => Some(index),
            Err(_) => {
                tracing::warn!(
                    entity_id = %reference.uid,
                    hotbar_id = %self.id,
                    index,
                    "cannot pin entity to hotbar outside of index range"
                );
                None
            }
        });

        if let Some(current) = self.slots.index_of(&reference.uid) {
            if preferred.is_some_and(|index| index != current) {
                tracing::debug!(
                    entity_id = %reference.uid,
                    hotbar_id = %self.id,
                    current,
                    "entity already pinned, keeping its slot"
                );
            }
            return Some(current);
        }

        if let Some(index) = preferred {
            if self.slots.get(index).is_some_and(Slot::is_empty) {
                return self.place(index, reference);
            }
            tracing::warn!(
                entity_id = %reference.uid,
                hotbar_id = %self.id,
                index,
                "cannot pin entity to an occupied cell, using first empty cell"
            );
        }

        match self.slots.first_empty_index() {
            Some(index) => self.place(index, reference),
            None => {
                tracing::debug!(
                    entity_id = %reference.uid,
                    hotbar_id = %self.id,
                    "hotbar is full, entity not pinned"
                );
                None
            }
        }
    }

    /// Pin an entity to the empty slot closest to `anchor`, walking in
    /// `direction` (the anchor itself included).
    ///
    /// An out-of-range anchor is logged and treated like no anchor. When no
    /// slot in that direction is free the entity takes the first empty slot.
    /// An entity already pinned stays where it is.
    pub fn add_entity_near(
        &mut self,
        reference: EntityReference,
        anchor: i64,
        direction: Direction,
    ) -> Option<usize> {
        let anchor = match self.slots.checked_index(anchor) {
            Ok(anchor) => anchor,
            Err(_) => {
                tracing::warn!(
                    entity_id = %reference.uid,
                    hotbar_id = %self.id,
                    index = anchor,
                    "cannot pin entity to hotbar outside of index range"
                );
                return self.add_entity(reference, None);
            }
        };

        if let Some(current) = self.slots.index_of(&reference.uid) {
            return Some(current);
        }

        match self.slots.find_closest_empty_index(anchor, direction) {
            Some(index) => self.place(index, reference),
            None => self.add_entity(reference, None),
        }
    }

    fn place(&mut self, index: usize, reference: EntityReference) -> Option<usize> {
        self.slots.set(index, Slot::Occupied(reference)).ok()?;
        Some(index)
    }

    /// Empty the slot holding `uid`. Returns whether a slot matched.
    pub fn remove_entity(&mut self, uid: &str) -> bool {
        match self.slots.index_of(uid) {
            Some(index) => self.slots.set(index, Slot::Empty).is_ok(),
            None => false,
        }
    }

    /// Move the occupant of `from` to `to`.
    ///
    /// An occupied target swaps with the source; an empty target receives the
    /// source's occupant and the source becomes empty. Indices of every other
    /// slot are untouched.
    pub fn move_entity(&mut self, from: i64, to: i64) -> Result<()> {
        let from = self.slots.checked_index(from)?;
        let to = self.slots.checked_index(to)?;

        if from != to {
            // An empty target makes the swap a relocation.
            self.slots.swap(from, to);
        }
        Ok(())
    }

    /// Update cached display metadata of pinned entities from `lookup`.
    /// Returns how many references changed.
    pub(crate) fn refresh_references<F>(&mut self, lookup: F) -> usize
    where
        F: Fn(&str) -> Option<EntityReference>,
    {
        let mut changed = 0;
        for entity in self.slots.occupied_mut() {
            if let Some(live) = lookup(&entity.uid) {
                if live.name != entity.name || live.source != entity.source {
                    entity.name = live.name;
                    entity.source = live.source;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Fit the slot sequence to `capacity`, returning references that did not fit.
    pub(crate) fn fit_to_capacity(&mut self, capacity: usize) -> Vec<EntityReference> {
        let slots = std::mem::replace(&mut self.slots, Slots::new(0)).into_vec();
        let (fitted, overflow) = Slots::fit(slots, capacity);
        self.slots = fitted;
        overflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(uid: &str) -> EntityReference {
        EntityReference::new(uid, uid, Some("local".to_string()))
    }

    fn hotbar() -> Hotbar {
        Hotbar::new(Uuid::new_v4(), "test", 12)
    }

    fn uids(hotbar: &Hotbar) -> Vec<Option<String>> {
        hotbar
            .slots()
            .iter()
            .map(|slot| slot.entity().map(|e| e.uid.clone()))
            .collect()
    }

    #[test]
    fn test_add_entity_takes_first_empty_cell() {
        let mut hotbar = hotbar();
        assert_eq!(hotbar.add_entity(entity("a"), None), Some(0));
        assert_eq!(hotbar.add_entity(entity("b"), None), Some(1));
    }

    #[test]
    fn test_add_entity_honors_empty_preferred_index() {
        let mut hotbar = hotbar();
        assert_eq!(hotbar.add_entity(entity("a"), Some(5)), Some(5));
        assert_eq!(hotbar.index_of("a"), Some(5));
    }

    #[test]
    fn test_add_entity_falls_back_when_preferred_is_occupied() {
        let mut hotbar = hotbar();
        hotbar.add_entity(entity("a"), Some(0));
        assert_eq!(hotbar.add_entity(entity("b"), Some(0)), Some(1));
        assert_eq!(hotbar.index_of("a"), Some(0));
    }

    #[test]
    fn test_add_entity_falls_back_when_preferred_is_out_of_range() {
        let mut hotbar = hotbar();
        assert_eq!(hotbar.add_entity(entity("a"), Some(-1)), Some(0));
        assert_eq!(hotbar.add_entity(entity("b"), Some(12)), Some(1));
    }

    #[test]
    fn test_add_entity_does_not_duplicate() {
        let mut hotbar = hotbar();
        hotbar.add_entity(entity("a"), Some(3));
        assert_eq!(hotbar.add_entity(entity("a"), Some(3)), Some(3));
        assert_eq!(hotbar.add_entity(entity("a"), None), Some(3));
        assert_eq!(hotbar.slots().occupied().count(), 1);
    }

    #[test]
    fn test_add_entity_dropped_when_full() {
        let mut hotbar = Hotbar::new(Uuid::new_v4(), "tiny", 2);
        hotbar.add_entity(entity("a"), None);
        hotbar.add_entity(entity("b"), None);
        assert_eq!(hotbar.add_entity(entity("c"), None), None);
        assert!(!hotbar.contains("c"));
    }

    #[test]
    fn test_add_entity_near_walks_to_closest_empty_cell() {
        let mut hotbar = hotbar();
        for index in [4, 5, 7] {
            hotbar.add_entity(entity(&format!("e{index}")), Some(index));
        }

        assert_eq!(hotbar.add_entity_near(entity("a"), 4, Direction::Forward), Some(6));
        assert_eq!(hotbar.add_entity_near(entity("b"), 5, Direction::Backward), Some(3));
        assert_eq!(hotbar.add_entity_near(entity("c"), 9, Direction::Forward), Some(9));
    }

    #[test]
    fn test_add_entity_near_falls_back_to_first_empty_cell() {
        let mut hotbar = hotbar();
        for index in 8..12 {
            hotbar.add_entity(entity(&format!("e{index}")), Some(index));
        }

        assert_eq!(hotbar.add_entity_near(entity("a"), 9, Direction::Forward), Some(0));
        assert_eq!(hotbar.add_entity_near(entity("b"), 12, Direction::Forward), Some(1));
        assert_eq!(hotbar.add_entity_near(entity("a"), 3, Direction::Forward), Some(0));
    }

    #[test]
    fn test_remove_entity() {
        let mut hotbar = hotbar();
        hotbar.add_entity(entity("a"), None);
        hotbar.add_entity(entity("b"), None);

        assert!(hotbar.remove_entity("a"));
        assert!(!hotbar.remove_entity("missing"));
        assert_eq!(hotbar.index_of("b"), Some(1));
        assert_eq!(hotbar.capacity(), 12);
    }

    #[test]
    fn test_move_entity_swaps_with_occupied_target() {
        let mut hotbar = hotbar();
        for uid in ["a", "b", "c", "d"] {
            hotbar.add_entity(entity(uid), None);
        }
        hotbar.move_entity(3, 0).unwrap();
        assert_eq!(
            &uids(&hotbar)[..4],
            &[
                Some("d".into()),
                Some("b".into()),
                Some("c".into()),
                Some("a".into())
            ]
        );
    }

    #[test]
    fn test_move_entity_relocates_to_empty_target() {
        let mut hotbar = hotbar();
        hotbar.add_entity(entity("a"), None);
        hotbar.add_entity(entity("b"), None);
        hotbar.move_entity(1, 5).unwrap();

        assert_eq!(hotbar.index_of("b"), Some(5));
        assert!(hotbar.slots().get(1).unwrap().is_empty());
    }

    #[test]
    fn test_move_entity_to_same_index_is_noop() {
        let mut hotbar = hotbar();
        hotbar.add_entity(entity("a"), None);
        let before = hotbar.clone();
        hotbar.move_entity(0, 0).unwrap();
        assert_eq!(hotbar, before);
    }

    #[test]
    fn test_move_entity_rejects_out_of_range() {
        let mut hotbar = hotbar();
        assert!(hotbar.move_entity(-1, 0).unwrap_err().is_range_error());
        assert!(hotbar.move_entity(0, 12).unwrap_err().is_range_error());
    }

    #[test]
    fn test_display_label() {
        let hotbar = Hotbar::new(Uuid::new_v4(), "Work", 12);
        assert_eq!(hotbar.display_label(1), "2: Work");
    }

    #[test]
    fn test_refresh_references_updates_stale_names() {
        let mut hotbar = hotbar();
        hotbar.add_entity(EntityReference::new("a", "old", None), None);
        let changed = hotbar.refresh_references(|uid| {
            (uid == "a").then(|| EntityReference::new("a", "new", Some("remote".into())))
        });

        assert_eq!(changed, 1);
        let pinned = hotbar.slots().get(0).unwrap().entity().unwrap();
        assert_eq!(pinned.name.as_deref(), Some("new"));
        assert_eq!(pinned.source.as_deref(), Some("remote"));
    }
}
