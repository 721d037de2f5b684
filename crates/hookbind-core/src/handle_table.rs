//! Identity map from registration id to registration metadata.

use std::collections::BTreeMap;

use hookbind_api::RegistrationId;

/// Allocates registration ids and owns their lifecycle.
///
/// Ids are handed out monotonically starting at 1. An invalidated id is
/// never handed out again.
#[derive(Debug)]
pub struct HandleTable<M> {
    next_id: u64,
    entries: BTreeMap<u64, M>,
}

impl<M> HandleTable<M> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    /// Store `meta` under a fresh id.
    pub fn store(&mut self, meta: M) -> RegistrationId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, meta);
        RegistrationId(id)
    }

    pub fn lookup(&self, id: RegistrationId) -> Option<&M> {
        self.entries.get(&id.0)
    }

    pub fn lookup_mut(&mut self, id: RegistrationId) -> Option<&mut M> {
        self.entries.get_mut(&id.0)
    }

    /// Remove an id. Repeated calls return `None` and touch nothing else.
    pub fn invalidate(&mut self, id: RegistrationId) -> Option<M> {
        self.entries.remove(&id.0)
    }

    pub fn contains(&self, id: RegistrationId) -> bool {
        self.entries.contains_key(&id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (RegistrationId, &M)> {
        self.entries.iter().map(|(id, meta)| (RegistrationId(*id), meta))
    }

    /// Total number of ids ever allocated.
    pub fn issued(&self) -> u64 {
        self.next_id - 1
    }
}

impl<M> Default for HandleTable<M> {
    fn default() -> Self {
        Self::new()
    }
}
