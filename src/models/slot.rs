use serde::{Deserialize, Serialize};

use super::entity::EntityReference;
use crate::error::{Result, StoreError};

/// One addressable position of a hotbar.
///
/// Persisted as `{ "entity": { ... } }` when occupied and `{}` when empty.
/// Legacy `null` entries still deserialize as [`Slot::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<SlotRecord>", into = "SlotRecord")]
pub enum Slot {
    #[default]
    Empty,
    Occupied(EntityReference),
}

#[derive(Clone, Serialize, Deserialize)]
struct SlotRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity: Option<EntityReference>,
}

impl From<Option<SlotRecord>> for Slot {
    fn from(record: Option<SlotRecord>) -> Self {
        match record.and_then(|r| r.entity) {
            Some(entity) => Slot::Occupied(entity),
            None => Slot::Empty,
        }
    }
}

impl From<Slot> for SlotRecord {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Empty => SlotRecord { entity: None },
            Slot::Occupied(entity) => SlotRecord {
                entity: Some(entity),
            },
        }
    }
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn entity(&self) -> Option<&EntityReference> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(entity) => Some(entity),
        }
    }

    pub fn holds(&self, uid: &str) -> bool {
        self.entity().is_some_and(|entity| entity.uid == uid)
    }
}

/// Scan direction for [`Slots::find_closest_empty_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Fixed-length ordered sequence of slots.
///
/// The length is set at construction and never changes: emptying a slot
/// leaves a [`Slot::Empty`] in place, so indices stay stable across every
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slots(Vec<Slot>);

impl Slots {
    pub fn new(capacity: usize) -> Self {
        Self(vec![Slot::Empty; capacity])
    }

    /// Fit persisted slots to `capacity`.
    ///
    /// Short sequences are padded with empty slots. Entries beyond capacity
    /// are cut off; the occupied ones among them are returned so the caller
    /// can report them.
    pub fn fit(mut slots: Vec<Slot>, capacity: usize) -> (Self, Vec<EntityReference>) {
        let overflow = if slots.len() > capacity {
            slots
                .split_off(capacity)
                .into_iter()
                .filter_map(|slot| match slot {
                    Slot::Occupied(entity) => Some(entity),
                    Slot::Empty => None,
                })
                .collect()
        } else {
            slots.resize(capacity, Slot::Empty);
            Vec::new()
        };
        (Self(slots), overflow)
    }

    pub(crate) fn into_vec(self) -> Vec<Slot> {
        self.0
    }

    pub fn capacity(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.0.get(index)
    }

    /// Replace the slot at `index`, returning the previous occupant.
    pub fn set(&mut self, index: usize, slot: Slot) -> Result<Slot> {
        let capacity = self.capacity();
        let target = self
            .0
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange {
                index: index as i64,
                capacity,
            })?;
        Ok(std::mem::replace(target, slot))
    }

    /// Convert a caller-supplied index into a slot index within `[0, capacity)`.
    pub fn checked_index(&self, index: i64) -> Result<usize> {
        let capacity = self.capacity();
        usize::try_from(index)
            .ok()
            .filter(|&i| i < capacity)
            .ok_or(StoreError::IndexOutOfRange { index, capacity })
    }

    /// Lowest-indexed empty slot, or `None` when every slot is occupied.
    pub fn first_empty_index(&self) -> Option<usize> {
        self.0.iter().position(Slot::is_empty)
    }

    /// Nearest empty slot starting at `from` (inclusive) and walking in
    /// `direction`. Stops at the sequence bounds.
    pub fn find_closest_empty_index(&self, from: usize, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Forward => (from..self.capacity()).find(|&i| self.0[i].is_empty()),
            Direction::Backward => {
                let start = from.min(self.capacity().checked_sub(1)?);
                (0..=start).rev().find(|&i| self.0[i].is_empty())
            }
        }
    }

    pub fn index_of(&self, uid: &str) -> Option<usize> {
        self.0.iter().position(|slot| slot.holds(uid))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.0.iter()
    }

    /// Occupied slots with their indices, in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &EntityReference)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.entity().map(|entity| (i, entity)))
    }

    pub(crate) fn occupied_mut(&mut self) -> impl Iterator<Item = &mut EntityReference> {
        self.0.iter_mut().filter_map(|slot| match slot {
            Slot::Occupied(entity) => Some(entity),
            Slot::Empty => None,
        })
    }

    /// Exchange two in-bounds slots. Callers check bounds first.
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.0.swap(a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn occupied(uid: &str) -> Slot {
        Slot::Occupied(EntityReference::new(uid, uid, None))
    }

    #[test]
    fn test_new_slots_are_all_empty() {
        let slots = Slots::new(12);
        assert_eq!(slots.capacity(), 12);
        assert!(slots.iter().all(Slot::is_empty));
        assert_eq!(slots.first_empty_index(), Some(0));
    }

    #[test]
    fn test_set_rejects_out_of_range_index() {
        let mut slots = Slots::new(3);
        let err = slots.set(3, occupied("a")).unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(slots.capacity(), 3);
    }

    #[test]
    fn test_emptying_does_not_compact() {
        let mut slots = Slots::new(4);
        slots.set(0, occupied("a")).unwrap();
        slots.set(1, occupied("b")).unwrap();
        slots.set(0, Slot::Empty).unwrap();

        assert_eq!(slots.capacity(), 4);
        assert_eq!(slots.index_of("b"), Some(1));
        assert_eq!(slots.first_empty_index(), Some(0));
    }

    #[test]
    fn test_first_empty_index_is_none_when_full() {
        let mut slots = Slots::new(2);
        slots.set(0, occupied("a")).unwrap();
        slots.set(1, occupied("b")).unwrap();
        assert_eq!(slots.first_empty_index(), None);
    }

    #[test]
    fn test_checked_index_bounds() {
        let slots = Slots::new(12);
        assert_eq!(slots.checked_index(0).unwrap(), 0);
        assert_eq!(slots.checked_index(11).unwrap(), 11);
        assert!(slots.checked_index(12).is_err());
        assert!(slots.checked_index(-1).is_err());
    }

    #[test]
    fn test_find_closest_empty_index() {
        let mut slots = Slots::new(5);
        slots.set(1, occupied("a")).unwrap();
        slots.set(2, occupied("b")).unwrap();

        assert_eq!(slots.find_closest_empty_index(1, Direction::Forward), Some(3));
        assert_eq!(slots.find_closest_empty_index(2, Direction::Backward), Some(0));
        assert_eq!(slots.find_closest_empty_index(9, Direction::Backward), Some(4));
        assert_eq!(slots.find_closest_empty_index(5, Direction::Forward), None);
    }

    #[test]
    fn test_fit_pads_and_reports_overflow() {
        let (padded, overflow) = Slots::fit(vec![occupied("a")], 3);
        assert_eq!(padded.capacity(), 3);
        assert!(overflow.is_empty());

        let (cut, overflow) = Slots::fit(vec![Slot::Empty, occupied("a"), occupied("b")], 2);
        assert_eq!(cut.capacity(), 2);
        assert_eq!(overflow.len(), 1);
        assert_eq!(overflow[0].uid, "b");
    }

    #[test]
    fn test_slot_serialization_shape() {
        let slots: Slots = serde_json::from_value(json!([
            { "entity": { "uid": "a", "name": "A", "source": "local" } },
            {},
            null
        ]))
        .unwrap();

        assert_eq!(slots.index_of("a"), Some(0));
        assert!(slots.get(1).unwrap().is_empty());
        assert!(slots.get(2).unwrap().is_empty());

        let json = serde_json::to_value(&slots).unwrap();
        assert_eq!(
            json,
            json!([{ "entity": { "uid": "a", "name": "A", "source": "local" } }, {}, {}])
        );
    }
}
