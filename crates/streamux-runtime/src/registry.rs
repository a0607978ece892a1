//! Keyed collection of named entries, iterated in registration order.
//!
//! Every entry gets a fresh [`SlotId`] when inserted. The reactor snapshots
//! ids before a pass, so an entry removed mid-pass is simply gone, and an
//! entry re-registered under the same name is a different slot that the
//! current pass never saw.
//!
//! The reactor checks an entry's value out while its callback runs; the
//! slot (and therefore the name) stays registered meanwhile.

use std::collections::{BTreeMap, HashMap};

use streamux_core::{Error, Result};

/// Registration-ordered identity of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u64);

struct Slot<T> {
    name: String,
    /// `None` while checked out.
    value: Option<T>,
}

pub struct Registry<T> {
    slots: BTreeMap<SlotId, Slot<T>>,
    index: HashMap<String, SlotId>,
    next_id: u64,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
        }
    }

    /// Check that `name` could be inserted right now.
    pub fn check_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("channel name must not be empty".into()));
        }
        if self.index.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Insert under a new unique name.
    pub fn insert(&mut self, name: &str, value: T) -> Result<SlotId> {
        self.check_name(name)?;
        let id = SlotId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            Slot {
                name: name.to_string(),
                value: Some(value),
            },
        );
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// True if `name` is registered, checked out or not.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        let id = self.index.get(name)?;
        self.slots.get(id)?.value.as_ref()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        let id = self.index.get(name)?;
        self.slots.get_mut(id)?.value.as_mut()
    }

    /// Unregister `name`.
    ///
    /// Returns the value, or `None` if it is currently checked out (the
    /// holder then owns it outright).
    pub fn remove(&mut self, name: &str) -> Result<Option<T>> {
        let id = self
            .index
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(self.slots.remove(&id).and_then(|slot| slot.value))
    }

    /// Number of registered names, including checked-out entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.values().map(|slot| slot.name.as_str())
    }

    /// Present entries in registration order, skipping checked-out ones.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str, &T)> + '_ {
        self.slots
            .iter()
            .filter_map(|(id, slot)| slot.value.as_ref().map(|v| (*id, slot.name.as_str(), v)))
    }

    pub(crate) fn contains_id(&self, id: SlotId) -> bool {
        self.slots.contains_key(&id)
    }

    pub(crate) fn get_by_id_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(&id)?.value.as_mut()
    }

    /// Take the value out, leaving the slot registered.
    pub(crate) fn checkout(&mut self, id: SlotId) -> Option<T> {
        self.slots.get_mut(&id)?.value.take()
    }

    /// Put a checked-out value back.
    ///
    /// If the slot was removed in the meantime the value is handed back
    /// for the caller to dispose of.
    pub(crate) fn checkin(&mut self, id: SlotId, value: T) -> Option<T> {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.value = Some(value);
                None
            }
            None => Some(value),
        }
    }

    /// Unregister by id. Returns the value if it was not checked out.
    pub(crate) fn remove_id(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.remove(&id)?;
        self.index.remove(&slot.name);
        slot.value
    }
}
